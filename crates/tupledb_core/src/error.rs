//! Error types for tupledb core.

use crate::types::{RelationTuple, TransactionId, TupleKey};
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures raised below the write path: by the storage engine, its commit
/// log, or the call context.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Byte store error.
    #[error("storage error: {0}")]
    Storage(#[from] tupledb_storage::StorageError),

    /// An insert would leave two live rows for one key.
    #[error("unique violation: {key} already has a live row")]
    UniqueViolation {
        /// The duplicated key.
        key: TupleKey,
    },

    /// The caller cancelled the call.
    #[error("write cancelled")]
    Cancelled,

    /// The call's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The engine minted a transaction id that does not advance.
    #[error("non-monotonic transaction id {issued}, last committed {last}")]
    NonMonotonic {
        /// The id just issued.
        issued: TransactionId,
        /// The highest id seen committed.
        last: TransactionId,
    },

    /// The request was rejected before touching the engine.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Why the request was rejected.
        message: String,
    },

    /// A commit log record could not be encoded or decoded.
    #[error("commit log codec error: {message}")]
    Codec {
        /// Codec failure description.
        message: String,
    },

    /// The commit log is structurally damaged.
    #[error("commit log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Offset of the damaged record.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// A commit log record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the damaged record.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },
}

impl EngineError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl fmt::Display) -> Self {
        Self::Codec {
            message: message.to_string(),
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Returns true for a duplicate live key.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Returns true if the call was cancelled or timed out.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Phase of a write call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStage {
    /// Opening the transaction and verifying preconditions.
    PreconditionCheck,
    /// Allocating the revision and applying mutations.
    WriteExecution,
    /// Committing the transaction.
    Commit,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PreconditionCheck => "precondition-check",
            Self::WriteExecution => "write-execution",
            Self::Commit => "commit",
        };
        f.write_str(label)
    }
}

/// Outcome of a failed `write_tuples` call.
///
/// In both cases the transaction was rolled back and nothing the call did is
/// visible.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A precondition tuple had no live row. Expected under contention; the
    /// caller may refresh its view and retry.
    #[error("precondition failed: {tuple} is not live")]
    PreconditionFailed {
        /// The first tuple found missing.
        tuple: RelationTuple,
    },

    /// The write could not be carried out.
    #[error("unable to write tuples ({stage}): {source}")]
    WriteFailed {
        /// Where the failure happened.
        stage: WriteStage,
        /// The underlying failure.
        #[source]
        source: EngineError,
    },
}

impl WriteError {
    /// Wraps an engine error with the stage it surfaced in.
    pub fn failed(stage: WriteStage, source: EngineError) -> Self {
        Self::WriteFailed { stage, source }
    }

    /// Returns true for a precondition conflict.
    #[must_use]
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    /// The offending tuple of a precondition conflict.
    #[must_use]
    pub fn failed_tuple(&self) -> Option<&RelationTuple> {
        match self {
            Self::PreconditionFailed { tuple } => Some(tuple),
            Self::WriteFailed { .. } => None,
        }
    }

    /// The stage of a fatal failure.
    #[must_use]
    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            Self::PreconditionFailed { .. } => None,
            Self::WriteFailed { stage, .. } => Some(*stage),
        }
    }

    /// The engine error behind a fatal failure.
    #[must_use]
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::PreconditionFailed { .. } => None,
            Self::WriteFailed { source, .. } => Some(source),
        }
    }
}
