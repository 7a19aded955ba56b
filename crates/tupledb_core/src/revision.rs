//! Externally visible revisions.

use crate::types::TransactionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version token of one committed write.
///
/// Callers treat it as opaque; it orders like the commits it stamps and
/// round-trips through its decimal string form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Revision(u64);

impl Revision {
    /// Revision of an empty store. No write ever returns it.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw revision value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a revision token cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid revision token `{0}`")]
pub struct ParseRevisionError(String);

impl FromStr for Revision {
    type Err = ParseRevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseRevisionError(s.to_string()))
    }
}

/// Maps committed transaction ids to revisions and back.
pub trait RevisionCodec: Send + Sync {
    /// Revision for a committed transaction.
    fn encode(&self, txn: TransactionId) -> Revision;

    /// Transaction whose commit a revision names.
    fn decode(&self, revision: Revision) -> TransactionId;
}

/// The identity mapping: revision `n` is transaction `n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRevisions;

impl RevisionCodec for TransactionRevisions {
    fn encode(&self, txn: TransactionId) -> Revision {
        Revision(txn.as_u64())
    }

    fn decode(&self, revision: Revision) -> TransactionId {
        TransactionId::new(revision.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let revision = Revision::new(1042);
        assert_eq!(revision.to_string(), "1042");
        assert_eq!("1042".parse::<Revision>().unwrap(), revision);
        assert_eq!(" 7 ".parse::<Revision>().unwrap(), Revision::new(7));
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert!("".parse::<Revision>().is_err());
        assert!("-3".parse::<Revision>().is_err());
        assert!("12a".parse::<Revision>().is_err());
    }

    #[test]
    fn codec_preserves_order() {
        let codec = TransactionRevisions;
        let a = codec.encode(TransactionId::new(4));
        let b = codec.encode(TransactionId::new(9));
        assert!(a < b);
        assert_eq!(codec.decode(b), TransactionId::new(9));
    }
}
