//! Turns requested mutations into close and insert statements.

use crate::mutation::{Mutation, Operation};
use crate::statement::{bulk_insert, close_live, BulkInsert, CloseLive};
use crate::types::TransactionId;

/// Statements for one write, all stamped with the same transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    /// Close updates, in mutation order.
    pub closes: Vec<CloseLive>,
    /// The single multi-row insert. May be empty.
    pub insert: BulkInsert,
}

impl WritePlan {
    /// Transaction id every statement is stamped with.
    #[must_use]
    pub fn txn(&self) -> TransactionId {
        self.insert.created_txn()
    }

    /// True when the plan writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty() && self.insert.is_empty()
    }
}

/// Classifies `mutations` into statements stamped with `txn`.
///
/// - `Delete` closes the live row, if any.
/// - `Create` inserts a row.
/// - `Touch` closes the live row, if any, and inserts a row.
#[must_use]
pub fn plan(mutations: &[Mutation], txn: TransactionId) -> WritePlan {
    let mut closes = Vec::new();
    let mut insert = bulk_insert(txn);

    for mutation in mutations {
        match mutation.operation {
            Operation::Delete => closes.push(close_live(&mutation.tuple, txn)),
            Operation::Create => insert.values(mutation.tuple.clone()),
            Operation::Touch => {
                closes.push(close_live(&mutation.tuple, txn));
                insert.values(mutation.tuple.clone());
            }
        }
    }

    WritePlan { closes, insert }
}
