//! CLI command implementations.

pub mod history;
pub mod read;
pub mod verify;
pub mod write;

use std::path::Path;
use tracing::warn;
use tupledb_core::{EngineConfig, LocalEngine};
use tupledb_storage::{FileBackend, InMemoryBackend};

/// Opens the store journaled at `path` for writing, creating it if missing.
pub fn open_store(path: &Path) -> Result<LocalEngine, Box<dyn std::error::Error>> {
    let backend = FileBackend::open_with_create_dirs(path)?;
    Ok(LocalEngine::open(Box::new(backend), EngineConfig::default())?)
}

/// A store replayed from an in-memory copy of its log.
pub struct Snapshot {
    /// Engine holding the replayed tables.
    pub engine: LocalEngine,
    /// Size of the log file on disk.
    pub on_disk: usize,
    /// Trailing bytes replay would discard as an incomplete record.
    pub discarded: usize,
}

/// Replays an existing store without touching its file.
///
/// Opening through [`open_store`] truncates a torn tail; read-only commands
/// use this instead so the file is never rewritten.
pub fn open_existing(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }

    let bytes = std::fs::read(path)?;
    let on_disk = bytes.len();
    let copy = InMemoryBackend::with_data(bytes);
    let engine = LocalEngine::open(Box::new(copy.clone()), EngineConfig::default())?;

    let discarded = on_disk.saturating_sub(copy.data().len());
    if discarded > 0 {
        warn!(path = %path.display(), discarded, "Log ends in an incomplete record");
    }

    Ok(Snapshot {
        engine,
        on_disk,
        discarded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tupledb_core::{Mutation, TupleWriter, WriteContext, LOG_MAGIC};

    #[test]
    fn missing_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_existing(&dir.path().join("absent.log")).is_err());
        assert!(!dir.path().join("absent.log").exists());
    }

    #[test]
    fn snapshot_of_torn_log_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuples.log");
        {
            let engine = open_store(&path).unwrap();
            let writer = TupleWriter::new(&engine).unwrap();
            writer
                .write_tuples(
                    &WriteContext::background(),
                    &[],
                    &[Mutation::create("document:a#viewer@user:x".parse().unwrap())],
                )
                .unwrap();
        }
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(&LOG_MAGIC);
        std::fs::write(&path, &bytes).unwrap();

        let snapshot = open_existing(&path).unwrap();
        assert_eq!(snapshot.engine.live_tuples().len(), 1);
        assert_eq!(snapshot.on_disk, bytes.len());
        assert_eq!(snapshot.discarded, LOG_MAGIC.len());
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    // Windows file locks are mandatory, so the copy read would fail there.
    #[cfg(unix)]
    #[test]
    fn snapshot_does_not_hold_the_write_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuples.log");
        let engine = open_store(&path).unwrap();

        let snapshot = open_existing(&path).unwrap();
        assert!(snapshot.engine.live_tuples().is_empty());
        assert!(open_store(&path).is_err());
        drop(engine);
    }
}
