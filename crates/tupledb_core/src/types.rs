//! Core type definitions for tupledb.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Subject relation of a direct subject (`user:alice` rather than
/// `group:eng#member`).
pub const ELLIPSIS: &str = "...";

/// Identity of one relation edge.
///
/// Textual form is `namespace:object_id#relation@subject_namespace:subject_id`
/// with an optional `#subject_relation` suffix; an omitted suffix means
/// [`ELLIPSIS`].
///
/// Deserialization applies the same component checks as
/// [`TupleKey::try_new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TupleKeyFields")]
pub struct TupleKey {
    /// Namespace of the object, e.g. `document`.
    pub namespace: String,
    /// Object identifier within the namespace.
    pub object_id: String,
    /// Relation from the object to the subject, e.g. `viewer`.
    pub relation: String,
    /// Namespace of the subject.
    pub subject_namespace: String,
    /// Subject identifier.
    pub subject_id: String,
    /// Relation on the subject, [`ELLIPSIS`] for direct subjects.
    pub subject_relation: String,
}

/// A relation tuple as referenced by preconditions and mutations.
pub type RelationTuple = TupleKey;

#[derive(Deserialize)]
struct TupleKeyFields {
    namespace: String,
    object_id: String,
    relation: String,
    subject_namespace: String,
    subject_id: String,
    subject_relation: String,
}

impl TryFrom<TupleKeyFields> for TupleKey {
    type Error = ParseTupleError;

    fn try_from(fields: TupleKeyFields) -> Result<Self, Self::Error> {
        Self::try_new(
            fields.namespace,
            fields.object_id,
            fields.relation,
            fields.subject_namespace,
            fields.subject_id,
            fields.subject_relation,
        )
    }
}

impl TupleKey {
    /// Builds a key from its six components without checking them.
    ///
    /// For known-good input. Use [`TupleKey::try_new`] or [`str::parse`] for
    /// anything caller-supplied.
    pub fn new(
        namespace: impl Into<String>,
        object_id: impl Into<String>,
        relation: impl Into<String>,
        subject_namespace: impl Into<String>,
        subject_id: impl Into<String>,
        subject_relation: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object_id: object_id.into(),
            relation: relation.into(),
            subject_namespace: subject_namespace.into(),
            subject_id: subject_id.into(),
            subject_relation: subject_relation.into(),
        }
    }

    /// Builds a key, rejecting empty components and components containing
    /// a separator (`:`, `#`, `@`).
    pub fn try_new(
        namespace: impl Into<String>,
        object_id: impl Into<String>,
        relation: impl Into<String>,
        subject_namespace: impl Into<String>,
        subject_id: impl Into<String>,
        subject_relation: impl Into<String>,
    ) -> Result<Self, ParseTupleError> {
        let key = Self::new(
            namespace,
            object_id,
            relation,
            subject_namespace,
            subject_id,
            subject_relation,
        );
        let input = key.to_string();
        for value in [
            &key.namespace,
            &key.object_id,
            &key.relation,
            &key.subject_namespace,
            &key.subject_id,
            &key.subject_relation,
        ] {
            component(&input, value)?;
        }
        Ok(key)
    }

    /// Returns a copy of this key pointing at a different direct subject.
    ///
    /// Like [`TupleKey::new`], the new subject is not checked.
    #[must_use]
    pub fn with_subject(&self, subject_namespace: &str, subject_id: &str) -> Self {
        Self {
            subject_namespace: subject_namespace.to_string(),
            subject_id: subject_id.to_string(),
            subject_relation: ELLIPSIS.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}#{}@{}:{}",
            self.namespace, self.object_id, self.relation, self.subject_namespace, self.subject_id
        )?;
        if self.subject_relation != ELLIPSIS {
            write!(f, "#{}", self.subject_relation)?;
        }
        Ok(())
    }
}

/// Error returned when a tuple string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tuple `{input}`: {reason}")]
pub struct ParseTupleError {
    input: String,
    reason: &'static str,
}

impl ParseTupleError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

fn component<'a>(input: &str, value: &'a str) -> Result<&'a str, ParseTupleError> {
    if value.is_empty() {
        return Err(ParseTupleError::new(input, "empty component"));
    }
    if value.contains([':', '#', '@']) {
        return Err(ParseTupleError::new(input, "unexpected separator"));
    }
    Ok(value)
}

impl FromStr for TupleKey {
    type Err = ParseTupleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (object, subject) = s
            .split_once('@')
            .ok_or_else(|| ParseTupleError::new(s, "missing `@`"))?;
        let (object_ref, relation) = object
            .split_once('#')
            .ok_or_else(|| ParseTupleError::new(s, "missing `#relation`"))?;
        let (namespace, object_id) = object_ref
            .split_once(':')
            .ok_or_else(|| ParseTupleError::new(s, "missing object namespace"))?;

        let (subject_ref, subject_relation) = match subject.split_once('#') {
            Some((subject_ref, rel)) => (subject_ref, rel),
            None => (subject, ELLIPSIS),
        };
        let (subject_namespace, subject_id) = subject_ref
            .split_once(':')
            .ok_or_else(|| ParseTupleError::new(s, "missing subject namespace"))?;

        Ok(Self::new(
            component(s, namespace)?,
            component(s, object_id)?,
            component(s, relation)?,
            component(s, subject_namespace)?,
            component(s, subject_id)?,
            component(s, subject_relation)?,
        ))
    }
}

/// Identifier the engine assigns to a write transaction.
///
/// Committed transaction ids strictly increase in commit order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Position of a row in the engine's append-only row table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

/// A persisted instance of a tuple key.
///
/// Rows are never removed. Deleting a tuple stamps `deleted_txn`, after which
/// the row is frozen and only serves snapshot reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// Row position.
    pub id: RowId,
    /// The tuple this row records.
    pub key: TupleKey,
    /// Transaction that inserted the row.
    pub created_txn: TransactionId,
    /// Transaction that closed the row; `None` while the row is live.
    pub deleted_txn: Option<TransactionId>,
}

impl StoredRow {
    /// Returns true while the row has not been closed.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_txn.is_none()
    }

    /// Returns true if the row is part of the live set as of `txn`.
    #[must_use]
    pub fn visible_at(&self, txn: TransactionId) -> bool {
        self.created_txn <= txn && self.deleted_txn.map_or(true, |deleted| deleted > txn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direct_subject() {
        let key: TupleKey = "document:readme#viewer@user:alice".parse().unwrap();
        assert_eq!(key.namespace, "document");
        assert_eq!(key.object_id, "readme");
        assert_eq!(key.relation, "viewer");
        assert_eq!(key.subject_namespace, "user");
        assert_eq!(key.subject_id, "alice");
        assert_eq!(key.subject_relation, ELLIPSIS);
        assert_eq!(key.to_string(), "document:readme#viewer@user:alice");
    }

    #[test]
    fn parses_userset_subject() {
        let key: TupleKey = "document:readme#viewer@group:eng#member".parse().unwrap();
        assert_eq!(key.subject_relation, "member");
        assert_eq!(key.to_string(), "document:readme#viewer@group:eng#member");
    }

    #[test]
    fn rejects_malformed_tuples() {
        for input in [
            "",
            "document:readme#viewer",
            "document:readme@user:alice",
            "readme#viewer@user:alice",
            "document:readme#viewer@alice",
            "document:#viewer@user:alice",
            "document:readme#viewer@user:alice#",
            "document:read:me#viewer@user:alice",
        ] {
            assert!(input.parse::<TupleKey>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn with_subject_keeps_object_side() {
        let key: TupleKey = "document:readme#viewer@group:eng#member".parse().unwrap();
        let moved = key.with_subject("user", "bob");
        assert_eq!(moved.to_string(), "document:readme#viewer@user:bob");
    }

    #[test]
    fn row_visibility_follows_created_and_deleted() {
        let row = StoredRow {
            id: RowId(0),
            key: "document:a#viewer@user:x".parse().unwrap(),
            created_txn: TransactionId::new(3),
            deleted_txn: Some(TransactionId::new(5)),
        };
        assert!(!row.visible_at(TransactionId::new(2)));
        assert!(row.visible_at(TransactionId::new(3)));
        assert!(row.visible_at(TransactionId::new(4)));
        assert!(!row.visible_at(TransactionId::new(5)));
        assert!(!row.is_live());
    }

    #[test]
    fn transaction_id_ordering_and_display() {
        let first = TransactionId::new(7);
        assert!(first < first.next());
        assert_eq!(first.to_string(), "txn:7");
    }

    #[test]
    fn try_new_checks_components() {
        let key = TupleKey::try_new("document", "readme", "viewer", "user", "alice", ELLIPSIS)
            .unwrap();
        assert_eq!(key.to_string(), "document:readme#viewer@user:alice");

        assert!(TupleKey::try_new("document", "", "viewer", "user", "alice", ELLIPSIS).is_err());
        assert!(TupleKey::try_new("document", "a", "viewer", "user", "b@c", ELLIPSIS).is_err());
    }

    #[test]
    fn deserialize_rejects_empty_components() {
        let unchecked = TupleKey::new("document", "readme", "", "user", "alice", ELLIPSIS);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&unchecked, &mut bytes).unwrap();

        let decoded: Result<TupleKey, _> = ciborium::de::from_reader(bytes.as_slice());
        assert!(decoded.is_err());

        let valid = TupleKey::new("document", "readme", "viewer", "user", "alice", ELLIPSIS);
        bytes.clear();
        ciborium::ser::into_writer(&valid, &mut bytes).unwrap();
        let decoded: TupleKey = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded, valid);
    }
}
