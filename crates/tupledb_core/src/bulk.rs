//! Applies a [`WritePlan`] to an open transaction.

use crate::context::WriteContext;
use crate::engine::EngineTransaction;
use crate::error::EngineResult;
use crate::planner::WritePlan;

/// What applying a plan did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Live rows closed.
    pub rows_closed: u64,
    /// Rows inserted.
    pub rows_inserted: u64,
    /// Multi-row inserts issued: 0 or 1.
    pub bulk_inserts: u64,
}

/// Runs every close update, then at most one multi-row insert.
///
/// A close that matches no live row is not an error.
///
/// # Errors
///
/// Stops at the first engine failure.
pub fn apply<T>(txn: &mut T, ctx: &WriteContext, plan: &WritePlan) -> EngineResult<WriteSummary>
where
    T: EngineTransaction + ?Sized,
{
    let mut summary = WriteSummary::default();

    for close in &plan.closes {
        summary.rows_closed += txn.close_live(ctx, close)?;
    }

    if !plan.insert.is_empty() {
        summary.rows_inserted = txn.insert_rows(ctx, &plan.insert)?;
        summary.bulk_inserts = 1;
    }

    Ok(summary)
}
