//! # tupledb storage
//!
//! Append-only byte stores for the tupledb commit log.
//!
//! A backend knows nothing about tuples, transactions or record framing. It
//! hands out offsets for appended bytes and reads them back. The commit log in
//! `tupledb_core` owns the record format on top of it.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral stores and tests
//! - [`FileBackend`] - a single journal file on disk
//!
//! ## Example
//!
//! ```rust
//! use tupledb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"txn").unwrap();
//! assert_eq!(backend.read_at(offset, 3).unwrap(), b"txn");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
