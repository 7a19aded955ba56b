//! End-to-end behavior of `write_tuples` against the local engine.

use tupledb_core::{
    LocalEngine, Mutation, Revision, StoredRow, TransactionId, TupleWriter, WriteContext,
    WriteStage,
};
use tupledb_testkit::{tuple, with_temp_store, InstrumentedEngine, TestStore};

fn bg() -> WriteContext {
    WriteContext::background()
}

fn txn(revision: Revision) -> TransactionId {
    TransactionId::new(revision.as_u64())
}

#[test]
fn touch_and_create_under_precondition() {
    with_temp_store(|store| {
        let a = tuple("document:readme#viewer@user:alice");
        let b = tuple("document:readme#owner@user:bob");
        let seeded = store.write(&[Mutation::create(a.clone())]);

        let revision = store
            .writer
            .write_tuples(
                &bg(),
                &[a.clone()],
                &[Mutation::touch(a.clone()), Mutation::create(b.clone())],
            )
            .unwrap();
        assert!(revision > seeded);

        let history = store.engine.history(&a);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_txn, txn(seeded));
        assert_eq!(history[0].deleted_txn, Some(txn(revision)));
        assert_eq!(history[1].created_txn, txn(revision));
        assert!(history[1].is_live());

        let b_rows = store.engine.history(&b);
        assert_eq!(b_rows.len(), 1);
        assert_eq!(b_rows[0].created_txn, txn(revision));

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.engine.live_tuples(), expected);
    });
}

#[test]
fn missing_precondition_rejects_whole_request() {
    with_temp_store(|store| {
        store.seed(&["document:a#viewer@user:x"]);
        let before: Vec<StoredRow> = store.engine.rows();
        let head = store.engine.head_txn();

        let missing = tuple("document:z#viewer@user:x");
        let err = store
            .writer
            .write_tuples(
                &bg(),
                &[tuple("document:a#viewer@user:x"), missing.clone()],
                &[
                    Mutation::delete(tuple("document:a#viewer@user:x")),
                    Mutation::create(tuple("document:b#viewer@user:x")),
                ],
            )
            .unwrap_err();

        assert!(err.is_precondition_failed());
        assert_eq!(err.failed_tuple(), Some(&missing));
        assert_eq!(store.engine.rows(), before);
        assert_eq!(store.engine.head_txn(), head);
    });
}

#[test]
fn delete_of_absent_tuple_still_returns_a_revision() {
    with_temp_store(|store| {
        let seeded = store.seed(&["document:a#viewer@user:x"]);
        let before = store.engine.rows();

        let revision = store
            .write(&[Mutation::delete(tuple("document:nope#viewer@user:x"))]);
        assert!(revision > seeded);
        assert_eq!(store.engine.rows(), before);
    });
}

#[test]
fn delete_is_idempotent() {
    with_temp_store(|store| {
        let t = tuple("document:a#viewer@user:x");
        store.write(&[Mutation::create(t.clone())]);
        let first = store.write(&[Mutation::delete(t.clone())]);
        let after_first = store.engine.rows();

        store.write(&[Mutation::delete(t.clone())]);
        assert_eq!(store.engine.rows(), after_first);

        let history = store.engine.history(&t);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].deleted_txn, Some(txn(first)));
    });
}

#[test]
fn touch_is_an_upsert() {
    with_temp_store(|store| {
        let t = tuple("document:a#viewer@user:x");

        let created = store.write(&[Mutation::touch(t.clone())]);
        assert_eq!(store.engine.history(&t).len(), 1);

        let touched = store.write(&[Mutation::touch(t.clone())]);
        let history = store.engine.history(&t);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].deleted_txn, Some(txn(touched)));
        assert_eq!(history[1].created_txn, txn(touched));
        assert!(created < touched);
        assert_eq!(store.engine.live_tuples(), vec![t]);
    });
}

#[test]
fn create_of_live_tuple_fails_and_changes_nothing() {
    with_temp_store(|store| {
        store.seed(&["document:a#viewer@user:x"]);
        let before = store.engine.rows();

        let err = store
            .writer
            .write_tuples(
                &bg(),
                &[],
                &[
                    Mutation::delete(tuple("document:b#viewer@user:x")),
                    Mutation::create(tuple("document:c#viewer@user:x")),
                    Mutation::create(tuple("document:a#viewer@user:x")),
                ],
            )
            .unwrap_err();

        assert_eq!(err.stage(), Some(WriteStage::WriteExecution));
        assert!(err.engine_error().is_some_and(|e| e.is_unique_violation()));
        assert_eq!(store.engine.rows(), before);
    });
}

#[test]
fn revisions_strictly_increase_and_skip_nothing_visible() {
    with_temp_store(|store| {
        let mut last = Revision::ZERO;
        for i in 0..20 {
            let t = tuple(&format!("document:d{i}#viewer@user:x"));
            let revision = if i % 3 == 0 {
                // A rejected request in between must not consume a visible revision.
                let rejected = store.writer.write_tuples(
                    &bg(),
                    &[tuple("document:missing#viewer@user:x")],
                    &[Mutation::create(t.clone())],
                );
                assert!(rejected.is_err());
                store.write(&[Mutation::create(t)])
            } else {
                store.write(&[Mutation::touch(t)])
            };
            assert!(revision > last);
            last = revision;
        }

        let committed = store.engine.transactions();
        assert_eq!(committed.len(), 20);
        assert!(committed.windows(2).all(|w| w[0] < w[1]));
    });
}

#[test]
fn batch_issues_exactly_one_insert() {
    let engine = InstrumentedEngine::new(LocalEngine::new());
    let writer = TupleWriter::new(&engine).unwrap();

    writer
        .write_tuples(
            &bg(),
            &[],
            &[
                Mutation::create(tuple("document:a#viewer@user:x")),
                Mutation::touch(tuple("document:b#viewer@user:x")),
                Mutation::delete(tuple("document:c#viewer@user:x")),
                Mutation::create(tuple("document:d#viewer@user:x")),
            ],
        )
        .unwrap();

    let counts = engine.counts();
    assert_eq!(counts.bulk_inserts, 1);
    assert_eq!(counts.inserted_rows, 3);
    assert_eq!(counts.closes, 2);
    assert_eq!(counts.allocations, 1);
    assert_eq!(counts.commits, 1);
    assert_eq!(counts.rollbacks, 0);

    let snapshot = writer.stats().snapshot();
    assert_eq!(snapshot.bulk_inserts, 1);
    assert_eq!(snapshot.rows_inserted, 3);
}

#[test]
fn deletes_only_issue_no_insert() {
    let engine = InstrumentedEngine::new(LocalEngine::new());
    let writer = TupleWriter::new(&engine).unwrap();

    writer
        .write_tuples(
            &bg(),
            &[],
            &[Mutation::delete(tuple("document:a#viewer@user:x"))],
        )
        .unwrap();
    assert_eq!(engine.counts().bulk_inserts, 0);
    assert_eq!(engine.counts().closes, 1);
}

#[test]
fn preconditions_are_checked_before_allocation() {
    let engine = InstrumentedEngine::new(LocalEngine::new());
    let writer = TupleWriter::new(&engine).unwrap();

    let err = writer
        .write_tuples(
            &bg(),
            &[
                tuple("document:a#viewer@user:x"),
                tuple("document:b#viewer@user:x"),
            ],
            &[Mutation::create(tuple("document:c#viewer@user:x"))],
        )
        .unwrap_err();
    assert!(err.is_precondition_failed());

    let counts = engine.counts();
    assert_eq!(counts.exists, 1);
    assert_eq!(counts.allocations, 0);
    assert_eq!(counts.closes + counts.bulk_inserts + counts.commits, 0);
    assert_eq!(counts.rollbacks, 1);
}

#[test]
fn snapshot_reads_see_historic_live_sets() {
    let store = TestStore::memory();
    let a = tuple("document:a#viewer@user:x");
    let b = tuple("document:b#viewer@user:x");

    let r1 = store.write(&[Mutation::create(a.clone())]);
    let r2 = store.write(&[Mutation::create(b.clone())]);
    let r3 = store.write(&[Mutation::delete(a.clone())]);
    let r4 = store.write(&[Mutation::touch(b.clone())]);

    assert!(store.engine.tuples_at(TransactionId::default()).is_empty());
    assert_eq!(store.engine.tuples_at(txn(r1)), vec![a.clone()]);
    assert_eq!(store.engine.tuples_at(txn(r2)), vec![a.clone(), b.clone()]);
    assert_eq!(store.engine.tuples_at(txn(r3)), vec![b.clone()]);
    assert_eq!(store.engine.tuples_at(txn(r4)), vec![b]);
    assert!(store.engine.committed_at(txn(r4)).is_some());
}
