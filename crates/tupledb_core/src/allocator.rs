//! Revision allocation.

use crate::context::WriteContext;
use crate::engine::EngineTransaction;
use crate::error::{EngineError, EngineResult};
use crate::types::TransactionId;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Mints one transaction id per write and checks it advances.
///
/// The engine owns the counter. The allocator only remembers the highest id
/// it has seen committed and refuses anything at or below it.
#[derive(Debug, Default)]
pub struct RevisionAllocator {
    last_committed: AtomicU64,
}

impl RevisionAllocator {
    /// Creates an allocator that has seen nothing committed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that has seen `head` committed.
    pub fn starting_at(head: TransactionId) -> Self {
        Self {
            last_committed: AtomicU64::new(head.as_u64()),
        }
    }

    /// Asks `txn` to mint its id.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, and returns [`EngineError::NonMonotonic`]
    /// if the minted id does not exceed the last committed one.
    pub fn allocate<T>(&self, txn: &mut T, ctx: &WriteContext) -> EngineResult<TransactionId>
    where
        T: EngineTransaction + ?Sized,
    {
        let issued = txn.create_transaction(ctx)?;
        let last = self.last_committed();
        if issued <= last {
            return Err(EngineError::NonMonotonic { issued, last });
        }
        trace!(%issued, %last, "allocated revision");
        Ok(issued)
    }

    /// Notes that `txn` committed.
    pub fn record_commit(&self, txn: TransactionId) {
        self.last_committed
            .fetch_max(txn.as_u64(), Ordering::AcqRel);
    }

    /// Highest id seen committed.
    pub fn last_committed(&self) -> TransactionId {
        TransactionId::new(self.last_committed.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LocalEngine, StorageEngine};

    #[test]
    fn allocates_next_id() {
        let engine = LocalEngine::new();
        let allocator = RevisionAllocator::new();
        let ctx = WriteContext::background();

        let mut txn = engine.begin(&ctx).unwrap();
        let id = allocator.allocate(txn.as_mut(), &ctx).unwrap();
        assert_eq!(id, TransactionId::new(1));
    }

    #[test]
    fn rejects_stale_id() {
        let engine = LocalEngine::new();
        let allocator = RevisionAllocator::starting_at(TransactionId::new(5));
        let ctx = WriteContext::background();

        let mut txn = engine.begin(&ctx).unwrap();
        let err = allocator.allocate(txn.as_mut(), &ctx).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NonMonotonic { issued, last }
                if issued == TransactionId::new(1) && last == TransactionId::new(5)
        ));
    }

    #[test]
    fn record_commit_only_moves_forward() {
        let allocator = RevisionAllocator::new();
        allocator.record_commit(TransactionId::new(3));
        allocator.record_commit(TransactionId::new(2));
        assert_eq!(allocator.last_committed(), TransactionId::new(3));
    }
}
