//! Failure handling: every failure rolls back and is labeled with its stage.

use std::time::{Duration, Instant};
use tupledb_core::{
    CancelToken, EngineError, LocalEngine, Mutation, Revision, TupleWriter, WriteContext,
    WriteError, WriteStage,
};
use tupledb_testkit::{tuple, FaultPoint, InstrumentedEngine};

/// Engine seeded with one live tuple, `document:a#viewer@user:x`.
fn seeded_engine() -> InstrumentedEngine<LocalEngine> {
    let engine = InstrumentedEngine::new(LocalEngine::new());
    TupleWriter::new(&engine)
        .unwrap()
        .write_tuples(
            &WriteContext::background(),
            &[],
            &[Mutation::create(tuple("document:a#viewer@user:x"))],
        )
        .unwrap();
    engine.reset_counts();
    engine
}

/// A request that reaches every call boundary: one existence query, one
/// close and one insert.
fn full_request(
    writer: &TupleWriter<&InstrumentedEngine<LocalEngine>>,
    ctx: &WriteContext,
) -> Result<Revision, WriteError> {
    writer.write_tuples(
        ctx,
        &[tuple("document:a#viewer@user:x")],
        &[
            Mutation::delete(tuple("document:a#viewer@user:x")),
            Mutation::create(tuple("document:b#viewer@user:x")),
        ],
    )
}

fn expected_stage(point: FaultPoint) -> WriteStage {
    match point {
        FaultPoint::Begin | FaultPoint::Exists => WriteStage::PreconditionCheck,
        FaultPoint::Allocate | FaultPoint::Close | FaultPoint::Insert => {
            WriteStage::WriteExecution
        }
        FaultPoint::Commit | FaultPoint::Rollback => WriteStage::Commit,
    }
}

#[test]
fn injected_fault_at_each_stage_rolls_back() {
    for point in FaultPoint::ALL {
        if point == FaultPoint::Rollback {
            continue;
        }
        let engine = seeded_engine();
        let before = engine.inner().rows();
        let head = engine.inner().head_txn();
        let writer = TupleWriter::new(&engine).unwrap();
        engine.fail_at(point);

        let err = full_request(&writer, &WriteContext::background()).unwrap_err();

        assert_eq!(err.stage(), Some(expected_stage(point)), "fault at {point}");
        assert!(
            matches!(err.engine_error(), Some(EngineError::Storage(_))),
            "fault at {point}: {err}"
        );
        assert_eq!(engine.inner().rows(), before, "fault at {point}");
        assert_eq!(engine.inner().head_txn(), head, "fault at {point}");

        let counts = engine.counts();
        let opened = u64::from(point != FaultPoint::Begin);
        assert_eq!(counts.rollbacks, opened, "fault at {point}");
        assert_eq!(writer.stats().writes_failed(), 1);
    }
}

#[test]
fn failed_rollback_does_not_mask_the_original_error() {
    let engine = seeded_engine();
    let before = engine.inner().rows();
    let writer = TupleWriter::new(&engine).unwrap();
    engine.fail_at(FaultPoint::Insert);
    engine.fail_at(FaultPoint::Rollback);

    let err = full_request(&writer, &WriteContext::background()).unwrap_err();
    assert_eq!(err.stage(), Some(WriteStage::WriteExecution));
    assert_eq!(engine.inner().rows(), before);

    engine.clear_faults();
    full_request(&writer, &WriteContext::background()).unwrap();
}

#[test]
fn cancellation_at_each_boundary_rolls_back() {
    for point in FaultPoint::ALL {
        if point == FaultPoint::Rollback {
            continue;
        }
        let engine = seeded_engine();
        let before = engine.inner().rows();
        let writer = TupleWriter::new(&engine).unwrap();
        let token = CancelToken::new();
        engine.cancel_at(point, token.clone());

        let ctx = WriteContext::background().with_cancel(token);
        let err = full_request(&writer, &ctx).unwrap_err();

        assert_eq!(err.stage(), Some(expected_stage(point)), "cancel at {point}");
        assert!(
            matches!(err.engine_error(), Some(EngineError::Cancelled)),
            "cancel at {point}: {err}"
        );
        assert_eq!(engine.inner().rows(), before, "cancel at {point}");
        assert_eq!(engine.inner().transactions().len(), 1, "cancel at {point}");
    }
}

#[test]
fn expired_deadline_fails_before_any_write() {
    let engine = seeded_engine();
    let before = engine.inner().rows();
    let writer = TupleWriter::new(&engine).unwrap();

    let ctx = WriteContext::background().with_deadline(Instant::now());
    let err = full_request(&writer, &ctx).unwrap_err();

    assert_eq!(err.stage(), Some(WriteStage::PreconditionCheck));
    assert!(matches!(err.engine_error(), Some(EngineError::DeadlineExceeded)));
    assert_eq!(engine.inner().rows(), before);
}

#[test]
fn generous_deadline_does_not_interfere() {
    let engine = seeded_engine();
    let writer = TupleWriter::new(&engine).unwrap();
    let ctx = WriteContext::background().with_timeout(Duration::from_secs(60));
    full_request(&writer, &ctx).unwrap();
    assert_eq!(engine.counts().commits, 1);
}

#[test]
fn store_accepts_writes_after_a_failure() {
    let engine = seeded_engine();
    let writer = TupleWriter::new(&engine).unwrap();

    engine.fail_at(FaultPoint::Commit);
    assert!(full_request(&writer, &WriteContext::background()).is_err());
    engine.clear_faults();

    let revision = full_request(&writer, &WriteContext::background()).unwrap();
    assert_eq!(revision.as_u64(), 2);
    assert_eq!(
        engine.inner().live_tuples(),
        vec![tuple("document:b#viewer@user:x")]
    );
}
