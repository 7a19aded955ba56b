//! Read command implementation.

use super::open_existing;
use std::path::Path;
use tupledb_core::{Revision, RevisionCodec, TransactionRevisions, TupleKey};

/// Runs the read command.
pub fn run(
    path: &Path,
    at: Option<Revision>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_existing(path)?.engine;
    let tuples = match at {
        Some(revision) => engine.tuples_at(TransactionRevisions.decode(revision)),
        None => engine.live_tuples(),
    };

    match format {
        "json" => {
            let rendered: Vec<String> = tuples.iter().map(TupleKey::to_string).collect();
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        _ => {
            for tuple in &tuples {
                println!("{tuple}");
            }
        }
    }

    Ok(())
}
