//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// The commit log writes one framed record per committed write transaction
/// and replays them in order on open. Backends never interpret those bytes.
///
/// # Invariants
///
/// - `append` returns the offset the first byte landed at
/// - `read_at` returns exactly the bytes previously appended at that offset
/// - after `sync` returns, every appended byte survives process termination
/// - `truncate` only shrinks; it is how recovery drops a torn tail record
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range is not fully
    /// inside the store, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it was written at.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered bytes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces appended bytes and metadata onto durable media.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the store size in bytes, which is the next append offset.
    fn size(&self) -> StorageResult<u64>;

    /// Shrinks the store to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncateBeyondEnd`] if `new_size` is
    /// larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
