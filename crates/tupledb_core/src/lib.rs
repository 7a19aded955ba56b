//! # tupledb core
//!
//! The write path of a versioned relationship-tuple store.
//!
//! A relationship tuple (`document:readme#viewer@user:alice`) is stored as a
//! row stamped with the transaction that created it and, once removed, the
//! transaction that closed it. Rows are never physically deleted, so the live
//! set at any past revision can be reconstructed.
//!
//! [`TupleWriter::write_tuples`] applies a batch of [`Mutation`]s atomically:
//!
//! 1. every precondition tuple must be live, else [`WriteError::PreconditionFailed`]
//! 2. one revision is allocated for the whole batch
//! 3. `Delete`/`Touch` close live rows, then all `Create`/`Touch` rows are
//!    inserted in a single multi-row insert
//! 4. the transaction commits and its [`Revision`] is returned
//!
//! Any other failure rolls the transaction back and surfaces as
//! [`WriteError::WriteFailed`] labeled with its [`WriteStage`].
//!
//! ## Engines
//!
//! The write path runs against the [`StorageEngine`] trait. [`LocalEngine`]
//! is the in-process implementation; open it over a
//! [`tupledb_storage::StorageBackend`] to journal every commit.
//!
//! ## Example
//!
//! ```rust
//! use tupledb_core::{LocalEngine, Mutation, TupleWriter, WriteContext};
//!
//! let writer = TupleWriter::new(LocalEngine::new()).unwrap();
//! let ctx = WriteContext::background();
//! let owner = "folder:docs#owner@user:alice".parse().unwrap();
//! let viewer = "document:readme#parent@folder:docs".parse().unwrap();
//!
//! writer.write_tuples(&ctx, &[], &[Mutation::create(owner)]).unwrap();
//! let revision = writer
//!     .write_tuples(
//!         &ctx,
//!         &["folder:docs#owner@user:alice".parse().unwrap()],
//!         &[Mutation::touch(viewer)],
//!     )
//!     .unwrap();
//! assert_eq!(writer.engine().live_tuples().len(), 2);
//! assert_eq!(revision.to_string(), "2");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod bulk;
mod config;
mod context;
mod coordinator;
mod engine;
mod error;
mod log;
mod mutation;
mod planner;
mod revision;
mod stats;
mod types;
mod validator;

pub mod statement;

pub use allocator::RevisionAllocator;
pub use bulk::{apply, WriteSummary};
pub use config::{EngineConfig, WriterConfig};
pub use context::{CancelToken, WriteContext};
pub use coordinator::TupleWriter;
pub use engine::{EngineTransaction, LocalEngine, LocalTransaction, StorageEngine, TransactionState};
pub use error::{EngineError, EngineResult, WriteError, WriteStage};
pub use log::{compute_crc32, CommitLog, CommitRecord, LOG_MAGIC, LOG_VERSION};
pub use mutation::{Mutation, Operation};
pub use planner::{plan, WritePlan};
pub use revision::{ParseRevisionError, Revision, RevisionCodec, TransactionRevisions};
pub use stats::{WriteStats, WriteStatsSnapshot};
pub use types::{
    ParseTupleError, RelationTuple, RowId, StoredRow, TransactionId, TupleKey, ELLIPSIS,
};
pub use validator::check_preconditions;
