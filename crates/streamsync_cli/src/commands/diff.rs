//! Diff command implementation.

use crate::fixture::open_hub;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use streamsync_hub::MemoryJobQueue;
use streamsync_protocol::DiffEntry;

/// Diff result as printed in JSON.
#[derive(Debug, Serialize)]
pub struct DiffOutput {
    /// Reference doctype.
    pub ref_doctype: String,
    /// Discrepancies in discovery order.
    pub entries: Vec<DiffEntry>,
    /// Condition problems.
    pub diagnostics: Vec<String>,
}

/// Runs the diff command.
pub fn run(
    config: &Path,
    store: &Path,
    doctype: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let hub = open_hub(config, store, Arc::new(MemoryJobQueue::new()))?;
    let report = hub.get_report(doctype)?;

    let output = DiffOutput {
        ref_doctype: doctype.to_string(),
        entries: report.entries,
        diagnostics: report.diagnostics.iter().map(ToString::to_string).collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_text(&output),
    }

    Ok(())
}

fn print_text(output: &DiffOutput) {
    for diagnostic in &output.diagnostics {
        println!("warning: {diagnostic}");
    }

    if output.entries.is_empty() {
        println!("Data document {} is up-to-date", output.ref_doctype);
        return;
    }

    println!("{:<40} Update Type", "Document");
    println!("{}", "-".repeat(52));
    for entry in &output.entries {
        println!("{:<40} {}", entry.document, entry.update_type);
    }
    println!();
    println!("{} entries", output.entries.len());
}
