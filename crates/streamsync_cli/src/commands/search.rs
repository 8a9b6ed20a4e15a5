//! Search command implementation.

use std::path::Path;
use streamsync_hub::{search_doctypes, StreamConfig};

/// Runs the search command.
pub fn run(
    config: &Path,
    txt: &str,
    start: usize,
    page_len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = StreamConfig::load(config)?;
    for doctype in search_doctypes(&config, txt, start, page_len) {
        println!("{doctype}");
    }
    Ok(())
}
