//! JSON write requests.
//!
//! ```json
//! {
//!   "preconditions": ["folder:docs#owner@user:alice"],
//!   "mutations": [
//!     { "operation": "touch", "tuple": "document:readme#parent@folder:docs" },
//!     { "operation": "delete", "tuple": "document:readme#viewer@user:bob" }
//!   ]
//! }
//! ```

use serde::Deserialize;
use thiserror::Error;
use tupledb_core::{Mutation, Operation, ParseTupleError, RelationTuple};

/// Errors reading a write request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request is not valid JSON of the expected shape.
    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),

    /// A tuple string does not parse.
    #[error("invalid tuple in {field}: {source}")]
    Tuple {
        /// Where the tuple appeared.
        field: String,
        /// The parse failure.
        #[source]
        source: ParseTupleError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    #[serde(default)]
    preconditions: Vec<String>,
    #[serde(default)]
    mutations: Vec<RawMutation>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMutation {
    operation: Operation,
    tuple: String,
}

/// A parsed write request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteRequest {
    /// Tuples that must be live.
    pub preconditions: Vec<RelationTuple>,
    /// Changes to apply.
    pub mutations: Vec<Mutation>,
}

impl WriteRequest {
    /// Parses a request from JSON text.
    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        let raw: RawRequest = serde_json::from_str(text)?;

        let preconditions = raw
            .preconditions
            .iter()
            .enumerate()
            .map(|(i, t)| parse_tuple(t, || format!("preconditions[{i}]")))
            .collect::<Result<_, _>>()?;
        let mutations = raw
            .mutations
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let tuple = parse_tuple(&m.tuple, || format!("mutations[{i}]"))?;
                Ok(Mutation::new(m.operation, tuple))
            })
            .collect::<Result<_, RequestError>>()?;

        Ok(Self {
            preconditions,
            mutations,
        })
    }
}

fn parse_tuple(text: &str, field: impl FnOnce() -> String) -> Result<RelationTuple, RequestError> {
    text.parse().map_err(|source| RequestError::Tuple {
        field: field(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_request() {
        let request = WriteRequest::from_json(
            r#"{
                "preconditions": ["folder:docs#owner@user:alice"],
                "mutations": [
                    {"operation": "touch", "tuple": "document:readme#parent@folder:docs"},
                    {"operation": "create", "tuple": "group:eng#member@user:bob"},
                    {"operation": "delete", "tuple": "document:readme#viewer@group:eng#member"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(request.preconditions.len(), 1);
        let operations: Vec<_> = request.mutations.iter().map(|m| m.operation).collect();
        assert_eq!(
            operations,
            [Operation::Touch, Operation::Create, Operation::Delete]
        );
        assert_eq!(request.mutations[2].tuple.subject_relation, "member");
    }

    #[test]
    fn empty_object_is_empty_request() {
        assert_eq!(WriteRequest::from_json("{}").unwrap(), WriteRequest::default());
    }

    #[test]
    fn bad_tuple_names_its_field() {
        let err = WriteRequest::from_json(
            r#"{"mutations": [{"operation": "create", "tuple": "document:a"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mutations[0]"));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = WriteRequest::from_json(
            r#"{"mutations": [{"operation": "upsert", "tuple": "document:a#viewer@user:x"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RequestError::Json(_)));
    }
}
