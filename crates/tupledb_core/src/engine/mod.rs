//! The storage engine seam.
//!
//! The write path owns no storage. It opens one transaction per call from a
//! [`StorageEngine`] and drives it through the statements in
//! [`crate::statement`]. Every call carries the caller's [`WriteContext`] so
//! an engine can honor cancellation and deadlines at its call boundary.
//!
//! ## Isolation requirement
//!
//! An existence query and the writes that follow it in the same transaction
//! must see one consistent view: two transactions touching the same keys must
//! not both commit outcomes based on the same live state. [`LocalEngine`]
//! meets this by admitting one writer at a time.

mod local;

pub use local::{LocalEngine, LocalTransaction, TransactionState};

use crate::context::WriteContext;
use crate::error::EngineResult;
use crate::statement::{BulkInsert, CloseLive, ExistsLive};
use crate::types::TransactionId;
use std::sync::Arc;

/// A store that hands out write transactions.
pub trait StorageEngine: Send + Sync {
    /// Opens a write transaction.
    fn begin(&self, ctx: &WriteContext) -> EngineResult<Box<dyn EngineTransaction + '_>>;

    /// Highest committed transaction id, [`TransactionId::default`] when empty.
    fn head(&self) -> EngineResult<TransactionId>;
}

/// One open write transaction.
///
/// Nothing written through a transaction is visible to anyone else before
/// [`EngineTransaction::commit`] returns `Ok`.
pub trait EngineTransaction {
    /// Mints the id of this transaction in the engine's transaction table.
    fn create_transaction(&mut self, ctx: &WriteContext) -> EngineResult<TransactionId>;

    /// Runs an existence query against this transaction's view.
    fn exists_live(&mut self, ctx: &WriteContext, query: &ExistsLive) -> EngineResult<bool>;

    /// Closes the live row matching the update's key. Returns the number of
    /// rows closed.
    fn close_live(&mut self, ctx: &WriteContext, update: &CloseLive) -> EngineResult<u64>;

    /// Executes a multi-row insert. Returns the number of rows inserted.
    fn insert_rows(&mut self, ctx: &WriteContext, insert: &BulkInsert) -> EngineResult<u64>;

    /// Publishes everything written through this transaction.
    fn commit(&mut self, ctx: &WriteContext) -> EngineResult<()>;

    /// Discards everything written through this transaction.
    fn rollback(&mut self) -> EngineResult<()>;
}

impl<E: StorageEngine + ?Sized> StorageEngine for Arc<E> {
    fn begin(&self, ctx: &WriteContext) -> EngineResult<Box<dyn EngineTransaction + '_>> {
        (**self).begin(ctx)
    }

    fn head(&self) -> EngineResult<TransactionId> {
        (**self).head()
    }
}

impl<E: StorageEngine + ?Sized> StorageEngine for &E {
    fn begin(&self, ctx: &WriteContext) -> EngineResult<Box<dyn EngineTransaction + '_>> {
        (**self).begin(ctx)
    }

    fn head(&self) -> EngineResult<TransactionId> {
        (**self).head()
    }
}
