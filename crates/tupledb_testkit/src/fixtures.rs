//! Test fixtures and store helpers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tupledb_core::{
    EngineConfig, LocalEngine, Mutation, Revision, TupleKey, TupleWriter, WriteContext,
    WriterConfig,
};
use tupledb_storage::FileBackend;

/// File name of the commit log inside a file-backed test store.
pub const LOG_FILE: &str = "tuples.log";

/// Parses a tuple from its textual form.
///
/// # Panics
///
/// Panics if `text` is not a valid tuple.
pub fn tuple(text: &str) -> TupleKey {
    text.parse()
        .unwrap_or_else(|err| panic!("invalid test tuple {text:?}: {err}"))
}

/// A writer over a fresh store, cleaned up on drop.
pub struct TestStore {
    /// The writer.
    pub writer: TupleWriter<Arc<LocalEngine>>,
    /// The engine the writer runs against.
    pub engine: Arc<LocalEngine>,
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory store.
    pub fn memory() -> Self {
        Self::memory_with(WriterConfig::default())
    }

    /// Creates an in-memory store with a custom writer configuration.
    pub fn memory_with(config: WriterConfig) -> Self {
        let engine = Arc::new(LocalEngine::new());
        let writer = TupleWriter::with_config(Arc::clone(&engine), config)
            .expect("Failed to create writer");
        Self {
            writer,
            engine,
            temp_dir: None,
        }
    }

    /// Creates a store journaled to a file in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let engine = open_file_engine(&temp_dir.path().join(LOG_FILE));
        let writer = TupleWriter::new(Arc::clone(&engine)).expect("Failed to create writer");
        Self {
            writer,
            engine,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the commit log path if file-backed.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|dir| dir.path().join(LOG_FILE))
    }

    /// Closes and reopens a file-backed store from its commit log.
    ///
    /// # Panics
    ///
    /// Panics for an in-memory store.
    pub fn reopen(self) -> Self {
        let temp_dir = self.temp_dir.expect("Only file stores can be reopened");
        drop(self.writer);
        drop(self.engine);

        let engine = open_file_engine(&temp_dir.path().join(LOG_FILE));
        let writer = TupleWriter::new(Arc::clone(&engine)).expect("Failed to create writer");
        Self {
            writer,
            engine,
            temp_dir: Some(temp_dir),
        }
    }

    /// Writes `mutations` with no preconditions, panicking on failure.
    pub fn write(&self, mutations: &[Mutation]) -> Revision {
        self.writer
            .write_tuples(&WriteContext::background(), &[], mutations)
            .expect("Failed to write tuples")
    }

    /// Creates every tuple in `tuples` in one write.
    pub fn seed(&self, tuples: &[&str]) -> Revision {
        let mutations: Vec<_> = tuples.iter().map(|t| Mutation::create(tuple(t))).collect();
        self.write(&mutations)
    }

    /// Live tuples rendered as text, sorted.
    pub fn live(&self) -> Vec<String> {
        self.engine
            .live_tuples()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

fn open_file_engine(path: &Path) -> Arc<LocalEngine> {
    let backend = FileBackend::open_with_create_dirs(path).expect("Failed to open log file");
    let engine = LocalEngine::open(Box::new(backend), EngineConfig::default())
        .expect("Failed to open store");
    Arc::new(engine)
}

/// Runs a test against a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Runs a test against a temporary file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::file();
    f(&store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        with_temp_store(|store| {
            assert!(store.live().is_empty());
            assert!(store.log_path().is_none());
        });
    }

    #[test]
    fn seed_writes_one_revision() {
        with_temp_store(|store| {
            let revision = store.seed(&["document:a#viewer@user:x", "document:b#viewer@user:x"]);
            assert_eq!(revision, Revision::new(1));
            assert_eq!(store.live().len(), 2);
        });
    }

    #[test]
    fn file_store_survives_reopen() {
        let store = TestStore::file();
        store.seed(&["document:a#viewer@user:x"]);
        assert!(store.log_path().is_some_and(|p| p.exists()));

        let store = store.reopen();
        assert_eq!(store.live(), vec!["document:a#viewer@user:x"]);
        assert_eq!(store.writer.last_revision(), Revision::new(1));
    }
}
