//! Requested tuple changes.

use crate::types::RelationTuple;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a mutation does to its tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Insert a new live row.
    Create,
    /// Close the live row, if any.
    Delete,
    /// Close the live row, if any, and insert a fresh one.
    Touch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Touch => "touch",
        };
        f.write_str(name)
    }
}

/// One requested change to the tuple store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mutation {
    /// The operation to perform.
    pub operation: Operation,
    /// The tuple it targets.
    pub tuple: RelationTuple,
}

impl Mutation {
    /// Creates a mutation.
    #[must_use]
    pub fn new(operation: Operation, tuple: RelationTuple) -> Self {
        Self { operation, tuple }
    }

    /// A `Create` mutation.
    #[must_use]
    pub fn create(tuple: RelationTuple) -> Self {
        Self::new(Operation::Create, tuple)
    }

    /// A `Delete` mutation.
    #[must_use]
    pub fn delete(tuple: RelationTuple) -> Self {
        Self::new(Operation::Delete, tuple)
    }

    /// A `Touch` mutation.
    #[must_use]
    pub fn touch(tuple: RelationTuple) -> Self {
        Self::new(Operation::Touch, tuple)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.tuple)
    }
}
