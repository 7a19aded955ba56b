//! Write command implementation.

use super::open_store;
use crate::request::WriteRequest;
use std::io::Read;
use std::path::Path;
use tracing::info;
use tupledb_core::{TupleWriter, WriteContext};

/// Runs the write command.
pub fn run(path: &Path, request_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = if request_path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(request_path)?
    };
    let request = WriteRequest::from_json(&text)?;

    let engine = open_store(path)?;
    let writer = TupleWriter::new(&engine)?;
    let revision = writer.write_tuples(
        &WriteContext::background(),
        &request.preconditions,
        &request.mutations,
    )?;
    info!(
        %revision,
        preconditions = request.preconditions.len(),
        mutations = request.mutations.len(),
        "Write committed"
    );

    println!("{revision}");
    Ok(())
}
