//! An engine wrapper that counts calls and injects failures.
//!
//! ```rust
//! use tupledb_core::{LocalEngine, Mutation, TupleWriter, WriteContext, WriteStage};
//! use tupledb_testkit::{tuple, FaultPoint, InstrumentedEngine};
//!
//! let engine = InstrumentedEngine::new(LocalEngine::new());
//! engine.fail_at(FaultPoint::Commit);
//! let writer = TupleWriter::new(&engine).unwrap();
//!
//! let err = writer
//!     .write_tuples(
//!         &WriteContext::background(),
//!         &[],
//!         &[Mutation::create(tuple("document:a#viewer@user:x"))],
//!     )
//!     .unwrap_err();
//! assert_eq!(err.stage(), Some(WriteStage::Commit));
//! assert_eq!(engine.counts().rollbacks, 1);
//! ```

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::io;
use tupledb_core::statement::{BulkInsert, CloseLive, ExistsLive};
use tupledb_core::{
    CancelToken, EngineError, EngineResult, EngineTransaction, StorageEngine, TransactionId,
    WriteContext,
};
use tupledb_storage::StorageError;

/// A call boundary where a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `StorageEngine::begin`.
    Begin,
    /// `EngineTransaction::exists_live`.
    Exists,
    /// `EngineTransaction::create_transaction`.
    Allocate,
    /// `EngineTransaction::close_live`.
    Close,
    /// `EngineTransaction::insert_rows`.
    Insert,
    /// `EngineTransaction::commit`.
    Commit,
    /// `EngineTransaction::rollback`.
    Rollback,
}

impl FaultPoint {
    /// Every fault point, in call order.
    pub const ALL: [FaultPoint; 7] = [
        FaultPoint::Begin,
        FaultPoint::Exists,
        FaultPoint::Allocate,
        FaultPoint::Close,
        FaultPoint::Insert,
        FaultPoint::Commit,
        FaultPoint::Rollback,
    ];
}

impl fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The error an injected fault raises.
pub fn injected_fault(point: FaultPoint) -> EngineError {
    EngineError::Storage(StorageError::Io(io::Error::other(format!(
        "injected fault at {point}"
    ))))
}

/// Calls observed by an [`InstrumentedEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Transactions opened.
    pub begins: u64,
    /// Existence queries.
    pub exists: u64,
    /// Transaction ids minted.
    pub allocations: u64,
    /// Close updates.
    pub closes: u64,
    /// Multi-row inserts.
    pub bulk_inserts: u64,
    /// Rows across all multi-row inserts.
    pub inserted_rows: u64,
    /// Commits attempted.
    pub commits: u64,
    /// Rollbacks attempted.
    pub rollbacks: u64,
}

#[derive(Debug, Default)]
struct Instruments {
    counts: Mutex<CallCounts>,
    faults: Mutex<HashSet<FaultPoint>>,
    trips: Mutex<Vec<(FaultPoint, CancelToken)>>,
}

impl Instruments {
    fn enter(&self, point: FaultPoint, count: impl FnOnce(&mut CallCounts)) -> EngineResult<()> {
        count(&mut *self.counts.lock());
        for (at, token) in self.trips.lock().iter() {
            if *at == point {
                token.cancel();
            }
        }
        if self.faults.lock().contains(&point) {
            return Err(injected_fault(point));
        }
        Ok(())
    }
}

/// Wraps a [`StorageEngine`], recording every call and failing on demand.
#[derive(Debug, Default)]
pub struct InstrumentedEngine<E> {
    inner: E,
    instruments: Instruments,
}

impl<E> InstrumentedEngine<E> {
    /// Wraps `inner`.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            instruments: Instruments::default(),
        }
    }

    /// Returns the wrapped engine.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Makes every later call at `point` fail with [`injected_fault`].
    pub fn fail_at(&self, point: FaultPoint) {
        self.instruments.faults.lock().insert(point);
    }

    /// Cancels `token` when a call reaches `point`, before the wrapped
    /// engine sees the call.
    pub fn cancel_at(&self, point: FaultPoint, token: CancelToken) {
        self.instruments.trips.lock().push((point, token));
    }

    /// Removes every injected fault and cancel trip.
    pub fn clear_faults(&self) {
        self.instruments.faults.lock().clear();
        self.instruments.trips.lock().clear();
    }

    /// Returns a copy of the call counts.
    pub fn counts(&self) -> CallCounts {
        self.instruments.counts.lock().clone()
    }

    /// Zeroes the call counts.
    pub fn reset_counts(&self) {
        *self.instruments.counts.lock() = CallCounts::default();
    }
}

impl<E: StorageEngine> StorageEngine for InstrumentedEngine<E> {
    fn begin(&self, ctx: &WriteContext) -> EngineResult<Box<dyn EngineTransaction + '_>> {
        self.instruments.enter(FaultPoint::Begin, |c| c.begins += 1)?;
        let inner = self.inner.begin(ctx)?;
        Ok(Box::new(InstrumentedTransaction {
            inner,
            instruments: &self.instruments,
        }))
    }

    fn head(&self) -> EngineResult<TransactionId> {
        self.inner.head()
    }
}

struct InstrumentedTransaction<'a> {
    inner: Box<dyn EngineTransaction + 'a>,
    instruments: &'a Instruments,
}

impl EngineTransaction for InstrumentedTransaction<'_> {
    fn create_transaction(&mut self, ctx: &WriteContext) -> EngineResult<TransactionId> {
        self.instruments.enter(FaultPoint::Allocate, |c| c.allocations += 1)?;
        self.inner.create_transaction(ctx)
    }

    fn exists_live(&mut self, ctx: &WriteContext, query: &ExistsLive) -> EngineResult<bool> {
        self.instruments.enter(FaultPoint::Exists, |c| c.exists += 1)?;
        self.inner.exists_live(ctx, query)
    }

    fn close_live(&mut self, ctx: &WriteContext, update: &CloseLive) -> EngineResult<u64> {
        self.instruments.enter(FaultPoint::Close, |c| c.closes += 1)?;
        self.inner.close_live(ctx, update)
    }

    fn insert_rows(&mut self, ctx: &WriteContext, insert: &BulkInsert) -> EngineResult<u64> {
        self.instruments.enter(FaultPoint::Insert, |c| {
            c.bulk_inserts += 1;
            c.inserted_rows += insert.len() as u64;
        })?;
        self.inner.insert_rows(ctx, insert)
    }

    fn commit(&mut self, ctx: &WriteContext) -> EngineResult<()> {
        self.instruments.enter(FaultPoint::Commit, |c| c.commits += 1)?;
        self.inner.commit(ctx)
    }

    fn rollback(&mut self) -> EngineResult<()> {
        let injected = self.instruments.enter(FaultPoint::Rollback, |c| c.rollbacks += 1);
        // The wrapped transaction is always discarded, even when the caller
        // is told the rollback failed.
        let result = self.inner.rollback();
        injected.and(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::tuple;
    use tupledb_core::statement::{bulk_insert, exists_live};
    use tupledb_core::LocalEngine;

    #[test]
    fn counts_calls() {
        let engine = InstrumentedEngine::new(LocalEngine::new());
        let ctx = WriteContext::background();
        {
            let mut txn = engine.begin(&ctx).unwrap();
            let id = txn.create_transaction(&ctx).unwrap();
            txn.exists_live(&ctx, &exists_live(&tuple("document:a#viewer@user:x")))
                .unwrap();
            let mut insert = bulk_insert(id);
            insert.values(tuple("document:a#viewer@user:x"));
            insert.values(tuple("document:b#viewer@user:x"));
            txn.insert_rows(&ctx, &insert).unwrap();
            txn.commit(&ctx).unwrap();
        }

        assert_eq!(
            engine.counts(),
            CallCounts {
                begins: 1,
                exists: 1,
                allocations: 1,
                closes: 0,
                bulk_inserts: 1,
                inserted_rows: 2,
                commits: 1,
                rollbacks: 0,
            }
        );
        engine.reset_counts();
        assert_eq!(engine.counts(), CallCounts::default());
    }

    #[test]
    fn injected_fault_fails_the_call() {
        let engine = InstrumentedEngine::new(LocalEngine::new());
        let ctx = WriteContext::background();
        engine.fail_at(FaultPoint::Begin);
        assert!(matches!(engine.begin(&ctx), Err(EngineError::Storage(_))));

        engine.clear_faults();
        assert!(engine.begin(&ctx).is_ok());
        assert_eq!(engine.counts().begins, 2);
    }

    #[test]
    fn failed_rollback_still_discards() {
        let engine = InstrumentedEngine::new(LocalEngine::new());
        let ctx = WriteContext::background();
        engine.fail_at(FaultPoint::Rollback);
        {
            let mut txn = engine.begin(&ctx).unwrap();
            let id = txn.create_transaction(&ctx).unwrap();
            let mut insert = bulk_insert(id);
            insert.values(tuple("document:a#viewer@user:x"));
            txn.insert_rows(&ctx, &insert).unwrap();
            assert!(txn.rollback().is_err());
        }
        assert!(engine.inner().rows().is_empty());
    }
}
