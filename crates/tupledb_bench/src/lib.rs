//! Benchmark utilities.

#![warn(missing_docs)]

use tupledb_core::{Mutation, TupleKey, ELLIPSIS};

/// Generates `count` distinct tuples, `document:d{i}#viewer@user:u{i % 97}`.
pub fn generate_tuples(count: usize) -> Vec<TupleKey> {
    (0..count)
        .map(|i| {
            TupleKey::new(
                "document",
                format!("d{i}"),
                "viewer",
                "user",
                format!("u{}", i % 97),
                ELLIPSIS,
            )
        })
        .collect()
}

/// Wraps every tuple in a mutation with the same operation.
pub fn mutations(tuples: &[TupleKey], make: fn(TupleKey) -> Mutation) -> Vec<Mutation> {
    tuples.iter().cloned().map(make).collect()
}
