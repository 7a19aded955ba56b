//! Property-based test generators using proptest.
//!
//! Keys are drawn from a deliberately small space so generated batches
//! collide often: the same tuple is created, touched and deleted across and
//! within requests.

use proptest::prelude::*;
use tupledb_core::{Mutation, Operation, TupleKey, ELLIPSIS};

/// Strategy for tuple keys over a small fixed vocabulary.
pub fn tuple_key_strategy() -> impl Strategy<Value = TupleKey> {
    (
        prop::sample::select(vec!["document", "folder"]),
        prop::sample::select(vec!["a", "b", "c"]),
        prop::sample::select(vec!["viewer", "owner"]),
        prop_oneof![
            3 => prop::sample::select(vec!["x", "y"])
                .prop_map(|id| ("user", id, ELLIPSIS)),
            1 => Just(("group", "eng", "member")),
        ],
    )
        .prop_map(|(namespace, object_id, relation, (sns, sid, srel))| {
            TupleKey::new(namespace, object_id, relation, sns, sid, srel)
        })
}

/// Strategy for a single operation.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Create),
        Just(Operation::Delete),
        Just(Operation::Touch),
    ]
}

/// Strategy for a single mutation.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    (operation_strategy(), tuple_key_strategy())
        .prop_map(|(operation, tuple)| Mutation::new(operation, tuple))
}

/// Strategy for one `write_tuples` request: preconditions and mutations.
pub fn request_strategy() -> impl Strategy<Value = (Vec<TupleKey>, Vec<Mutation>)> {
    (
        prop::collection::vec(tuple_key_strategy(), 0..2),
        prop::collection::vec(mutation_strategy(), 0..6),
    )
}

/// Strategy for a sequence of requests.
pub fn history_strategy(max_len: usize) -> impl Strategy<Value = Vec<(Vec<TupleKey>, Vec<Mutation>)>> {
    prop::collection::vec(request_strategy(), 1..=max_len)
}
