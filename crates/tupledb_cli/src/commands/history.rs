//! History command implementation.

use super::open_existing;
use serde::Serialize;
use std::path::Path;
use tupledb_core::{StoredRow, TupleKey};

/// One stored row as printed.
#[derive(Debug, Serialize)]
pub struct RowView {
    /// Row position.
    pub row: u64,
    /// The tuple.
    pub tuple: String,
    /// Revision that created the row.
    pub created: u64,
    /// Revision that closed the row, if closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

impl From<&StoredRow> for RowView {
    fn from(row: &StoredRow) -> Self {
        Self {
            row: row.id.0,
            tuple: row.key.to_string(),
            created: row.created_txn.as_u64(),
            deleted: row.deleted_txn.map(|txn| txn.as_u64()),
        }
    }
}

/// Runs the history command.
pub fn run(
    path: &Path,
    tuple: Option<&TupleKey>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_existing(path)?.engine;
    let rows = match tuple {
        Some(key) => engine.history(key),
        None => engine.rows(),
    };
    let views: Vec<RowView> = rows.iter().map(RowView::from).collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&views)?),
        _ => {
            for view in &views {
                let deleted = view
                    .deleted
                    .map_or_else(|| "live".to_string(), |d| d.to_string());
                println!("{:>6}  {:>6}  {:>6}  {}", view.row, view.created, deleted, view.tuple);
            }
        }
    }

    Ok(())
}
