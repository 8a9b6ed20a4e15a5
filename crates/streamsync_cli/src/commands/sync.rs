//! Sync command implementation.

use crate::fixture::open_hub;
use std::path::Path;
use std::sync::Arc;
use streamsync_hub::MemoryJobQueue;
use streamsync_protocol::{SiteContext, SyncPayload, SyncStatus};

/// Runs the sync command.
///
/// Jobs go to an in-memory queue, so this shows what a dispatch would
/// schedule without any worker picking them up.
pub fn run(
    config: &Path,
    store: &Path,
    payload: &Path,
    site: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(MemoryJobQueue::new());
    let hub = open_hub(config, store, queue.clone())?;

    let json = std::fs::read_to_string(payload)?;
    let payload = SyncPayload::from_json(&json)?;
    let context = SiteContext::new(site);

    let summary = hub.dispatch(&context, &payload)?;

    println!("Scheduled jobs ({}):", summary.scheduled.len());
    for (job, state) in queue.jobs(&context) {
        println!(
            "  {}  {} {} {} [{}:{}] {:?}",
            job.id,
            job.args.update_type,
            job.doctype,
            job.args.document.name().unwrap_or_default(),
            job.queue,
            job.task,
            state
        );
    }
    if summary.skipped_duplicate > 0 {
        println!("Skipped duplicates: {}", summary.skipped_duplicate);
    }
    println!("{}", SyncStatus::Success);

    Ok(())
}
