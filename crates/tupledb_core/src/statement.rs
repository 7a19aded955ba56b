//! Statements the write path issues against an engine transaction.
//!
//! Each call to a factory function returns a fresh value; nothing here holds
//! state between write calls.

use crate::types::{TransactionId, TupleKey};

/// Does a live row exist for exactly this key?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistsLive {
    /// Key to look up.
    pub key: TupleKey,
}

/// Close the live row for a key, if there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseLive {
    /// Key whose live row is closed.
    pub key: TupleKey,
    /// Stamp written into the row's `deleted_txn`.
    pub deleted_txn: TransactionId,
}

/// One multi-row insert. Every row shares `created_txn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkInsert {
    created_txn: TransactionId,
    rows: Vec<TupleKey>,
}

impl BulkInsert {
    /// Appends a row.
    pub fn values(&mut self, key: TupleKey) {
        self.rows.push(key);
    }

    /// Creation stamp of every row.
    #[must_use]
    pub fn created_txn(&self) -> TransactionId {
        self.created_txn
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[TupleKey] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no row was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Existence query for the live row of `key`.
#[must_use]
pub fn exists_live(key: &TupleKey) -> ExistsLive {
    ExistsLive { key: key.clone() }
}

/// Close update for the live row of `key`, stamped with `txn`.
#[must_use]
pub fn close_live(key: &TupleKey, txn: TransactionId) -> CloseLive {
    CloseLive {
        key: key.clone(),
        deleted_txn: txn,
    }
}

/// An empty multi-row insert stamped with `txn`.
#[must_use]
pub fn bulk_insert(txn: TransactionId) -> BulkInsert {
    BulkInsert {
        created_txn: txn,
        rows: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_insert_accumulates_rows() {
        let mut insert = bulk_insert(TransactionId::new(3));
        assert!(insert.is_empty());

        insert.values("document:a#viewer@user:x".parse().unwrap());
        insert.values("document:b#viewer@user:x".parse().unwrap());

        assert_eq!(insert.len(), 2);
        assert_eq!(insert.created_txn(), TransactionId::new(3));
        assert_eq!(insert.rows()[1].object_id, "b");
    }

    #[test]
    fn factories_return_independent_values() {
        let mut first = bulk_insert(TransactionId::new(1));
        first.values("document:a#viewer@user:x".parse().unwrap());
        let second = bulk_insert(TransactionId::new(1));
        assert!(second.is_empty());
    }
}
