//! A reference model of the write path.
//!
//! [`LiveModel`] keeps only the live set and predicts what a `write_tuples`
//! call must do to it. Property tests drive a real store and the model with
//! the same requests and compare.

use std::collections::{BTreeSet, HashSet};
use tupledb_core::{Mutation, Operation, RelationTuple, TupleKey, WriteError};

/// What the model expects a write to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// The write commits.
    Committed,
    /// The first missing precondition.
    PreconditionFailed(TupleKey),
    /// A create collides with a live row or another row in the batch.
    UniqueViolation,
}

impl Expected {
    /// Returns true if `outcome` matches this expectation.
    pub fn matches<T>(&self, outcome: &Result<T, WriteError>) -> bool {
        match (self, outcome) {
            (Expected::Committed, Ok(_)) => true,
            (Expected::PreconditionFailed(expected), Err(err)) => {
                err.failed_tuple() == Some(expected)
            }
            (Expected::UniqueViolation, Err(err)) => err
                .engine_error()
                .is_some_and(tupledb_core::EngineError::is_unique_violation),
            _ => false,
        }
    }
}

/// The live set, updated the way the write path updates a store.
#[derive(Debug, Clone, Default)]
pub struct LiveModel {
    live: BTreeSet<TupleKey>,
}

impl LiveModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one request, changing the live set only if it commits.
    pub fn apply(&mut self, preconditions: &[RelationTuple], mutations: &[Mutation]) -> Expected {
        if let Some(missing) = preconditions.iter().find(|t| !self.live.contains(*t)) {
            return Expected::PreconditionFailed(missing.clone());
        }

        let mut next = self.live.clone();
        for mutation in mutations {
            if matches!(mutation.operation, Operation::Delete | Operation::Touch) {
                next.remove(&mutation.tuple);
            }
        }

        let mut batch = HashSet::new();
        for mutation in mutations {
            let inserts = matches!(mutation.operation, Operation::Create | Operation::Touch);
            if inserts && (next.contains(&mutation.tuple) || !batch.insert(&mutation.tuple)) {
                return Expected::UniqueViolation;
            }
        }
        next.extend(batch.into_iter().cloned());

        self.live = next;
        Expected::Committed
    }

    /// Live tuples, sorted.
    pub fn live(&self) -> Vec<TupleKey> {
        self.live.iter().cloned().collect()
    }
}
