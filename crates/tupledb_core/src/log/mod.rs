//! Commit log: the durable history of committed write transactions.
//!
//! One framed [`CommitRecord`] is appended per commit, before the commit is
//! published in memory. Opening a store replays the log in order.
//!
//! ## Recovery policy
//!
//! - A record cut short at the end of the log (crash mid-append) is
//!   discarded and the log truncated back to the last complete record.
//! - Bad magic, an unknown version, a checksum mismatch or an undecodable
//!   payload is fatal: the store refuses to open.

mod record;

pub use record::{compute_crc32, CommitRecord, LOG_MAGIC, LOG_VERSION};

use crate::error::{EngineError, EngineResult};
use record::{FrameHeader, CRC_SIZE, HEADER_SIZE};
use tracing::{debug, warn};
use tupledb_storage::StorageBackend;

/// Append-only journal of [`CommitRecord`]s over a byte store.
pub struct CommitLog {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl CommitLog {
    /// Wraps a byte store.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
        }
    }

    /// Appends one record and makes it durable.
    ///
    /// On failure the log is cut back to its previous length so a later
    /// append does not land behind a half-written frame.
    pub fn append(&mut self, record: &CommitRecord) -> EngineResult<u64> {
        let frame = record.encode()?;
        let start = self.backend.size()?;

        match self.write_frame(&frame) {
            Ok(offset) => Ok(offset),
            Err(err) => {
                if let Err(cleanup) = self.backend.truncate(start) {
                    warn!(offset = start, error = %cleanup, "failed to cut back commit log");
                }
                Err(err)
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> EngineResult<u64> {
        let offset = self.backend.append(frame)?;
        if self.sync_on_commit {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(offset)
    }

    /// Reads every complete record in order, dropping a torn tail.
    pub fn replay(&mut self) -> EngineResult<Vec<CommitRecord>> {
        let size = self.backend.size()?;
        let mut records = Vec::new();
        let mut offset = 0u64;

        while offset < size {
            let remaining = size - offset;
            if remaining < HEADER_SIZE as u64 {
                self.drop_torn_tail(offset, size)?;
                break;
            }

            let header_bytes: [u8; HEADER_SIZE] = self
                .backend
                .read_at(offset, HEADER_SIZE)?
                .try_into()
                .map_err(|_| EngineError::log_corruption(offset, "short header read"))?;
            let header = FrameHeader::parse(&header_bytes)
                .ok_or_else(|| EngineError::log_corruption(offset, "bad magic"))?;
            if header.version != LOG_VERSION {
                return Err(EngineError::log_corruption(
                    offset,
                    format!("unsupported version {}", header.version),
                ));
            }

            let frame_len = header.frame_len();
            if remaining < frame_len {
                self.drop_torn_tail(offset, size)?;
                break;
            }

            let frame_len = usize::try_from(frame_len)
                .map_err(|_| EngineError::log_corruption(offset, "frame too large"))?;
            let frame = self.backend.read_at(offset, frame_len)?;
            let body_end = frame_len - CRC_SIZE;
            let mut stored = [0u8; CRC_SIZE];
            stored.copy_from_slice(&frame[body_end..]);
            let expected = u32::from_le_bytes(stored);
            let actual = compute_crc32(&frame[..body_end]);
            if expected != actual {
                return Err(EngineError::ChecksumMismatch {
                    offset,
                    expected,
                    actual,
                });
            }

            records.push(CommitRecord::decode_payload(&frame[HEADER_SIZE..body_end])?);
            offset += frame_len as u64;
        }

        debug!(records = records.len(), bytes = offset, "replayed commit log");
        Ok(records)
    }

    fn drop_torn_tail(&mut self, offset: u64, size: u64) -> EngineResult<()> {
        warn!(
            offset,
            discarded = size - offset,
            "discarding incomplete commit log record"
        );
        self.backend.truncate(offset)?;
        Ok(())
    }

    /// Current log size in bytes.
    pub fn size(&self) -> EngineResult<u64> {
        Ok(self.backend.size()?)
    }
}

impl std::fmt::Debug for CommitLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLog")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}
