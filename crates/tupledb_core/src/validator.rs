//! Precondition checks.

use crate::context::WriteContext;
use crate::engine::EngineTransaction;
use crate::error::{WriteError, WriteStage};
use crate::statement::exists_live;
use crate::types::RelationTuple;

/// Verifies every precondition has a live row in `txn`'s view.
///
/// Tuples are checked in input order and the first missing one is reported.
///
/// # Errors
///
/// [`WriteError::PreconditionFailed`] for a missing tuple, or
/// [`WriteError::WriteFailed`] at [`WriteStage::PreconditionCheck`] if the
/// engine fails.
pub fn check_preconditions<T>(
    txn: &mut T,
    ctx: &WriteContext,
    preconditions: &[RelationTuple],
) -> Result<(), WriteError>
where
    T: EngineTransaction + ?Sized,
{
    for tuple in preconditions {
        let found = txn
            .exists_live(ctx, &exists_live(tuple))
            .map_err(|err| WriteError::failed(WriteStage::PreconditionCheck, err))?;
        if !found {
            return Err(WriteError::PreconditionFailed {
                tuple: tuple.clone(),
            });
        }
    }
    Ok(())
}
