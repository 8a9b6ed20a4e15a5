//! Background job queue for propagation tasks.

use crate::config::QueueClass;
use crate::error::{HubError, HubResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamsync_protocol::{PropagationArgs, SiteContext, UpdateType};
use uuid::Uuid;

/// A scheduled propagation of one producer document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationJob {
    /// Unique job id.
    pub id: Uuid,
    /// Task executed by the worker.
    pub task: String,
    /// Queue class.
    pub queue: QueueClass,
    /// Site the job runs against.
    pub context: SiteContext,
    /// Reference doctype of the document.
    pub doctype: String,
    /// Task arguments.
    pub args: PropagationArgs,
    /// Deduplication key, see [`idempotency_key`].
    pub idempotency_key: String,
    /// Whether the job was held until its batch committed.
    pub enqueue_after_commit: bool,
}

/// Result of [`JobQueue::enqueue_unique`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The job was added.
    Enqueued(Uuid),
    /// A pending job already carries the same key.
    Duplicate {
        /// Id of the pending job.
        existing: Uuid,
    },
}

impl EnqueueOutcome {
    /// Returns true if the job was added.
    pub fn is_enqueued(&self) -> bool {
        matches!(self, EnqueueOutcome::Enqueued(_))
    }
}

/// Derives the deduplication key for a propagation.
///
/// The key is the hex SHA-256 of `site/task/doctype/name/update_type`, so
/// the same document propagated twice on one site collapses to one job.
pub fn idempotency_key(
    context: &SiteContext,
    task: &str,
    doctype: &str,
    name: &str,
    update_type: UpdateType,
) -> String {
    let composite = format!("{}/{task}/{doctype}/{name}/{update_type}", context.site());
    let digest = Sha256::digest(composite.as_bytes());
    format!("{digest:x}")
}

/// A queue of propagation jobs.
pub trait JobQueue: Send + Sync {
    /// Idempotency keys of queued or running jobs for a site.
    fn pending_jobs(&self, context: &SiteContext) -> HubResult<HashSet<String>>;

    /// Adds a job unless a pending job has the same idempotency key.
    ///
    /// The check and the insert happen atomically.
    fn enqueue_unique(&self, job: PropagationJob) -> HubResult<EnqueueOutcome>;
}

impl<Q: JobQueue + ?Sized> JobQueue for Arc<Q> {
    fn pending_jobs(&self, context: &SiteContext) -> HubResult<HashSet<String>> {
        (**self).pending_jobs(context)
    }

    fn enqueue_unique(&self, job: PropagationJob) -> HubResult<EnqueueOutcome> {
        (**self).enqueue_unique(job)
    }
}

/// Lifecycle state of a job in [`MemoryJobQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a worker.
    Queued,
    /// Taken by a worker.
    Running,
}

#[derive(Debug)]
struct Entry {
    job: PropagationJob,
    state: JobState,
}

/// In-memory job queue.
///
/// Jobs stay pending until a worker calls [`MemoryJobQueue::complete`].
#[derive(Debug)]
pub struct MemoryJobQueue {
    entries: Mutex<Vec<Entry>>,
    available: AtomicBool,
}

impl MemoryJobQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Moves the oldest queued job of a site to running and returns it.
    pub fn take_next(&self, context: &SiteContext) -> HubResult<Option<PropagationJob>> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Ok(entries
            .iter_mut()
            .find(|e| e.state == JobState::Queued && e.job.context == *context)
            .map(|e| {
                e.state = JobState::Running;
                e.job.clone()
            }))
    }

    /// Removes a finished job. Returns false if the id is unknown.
    pub fn complete(&self, id: Uuid) -> HubResult<bool> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.job.id != id);
        Ok(entries.len() != before)
    }

    /// Pending jobs of a site with their state, oldest first.
    pub fn jobs(&self, context: &SiteContext) -> Vec<(PropagationJob, JobState)> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.job.context == *context)
            .map(|e| (e.job.clone(), e.state))
            .collect()
    }

    /// Total number of pending jobs across sites.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no jobs are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulates a broker outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> HubResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HubError::queue("queue unavailable"))
        }
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue for MemoryJobQueue {
    fn pending_jobs(&self, context: &SiteContext) -> HubResult<HashSet<String>> {
        self.check_available()?;
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| e.job.context == *context)
            .map(|e| e.job.idempotency_key.clone())
            .collect())
    }

    fn enqueue_unique(&self, job: PropagationJob) -> HubResult<EnqueueOutcome> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        if let Some(existing) = entries
            .iter()
            .find(|e| e.job.context == job.context && e.job.idempotency_key == job.idempotency_key)
        {
            return Ok(EnqueueOutcome::Duplicate {
                existing: existing.job.id,
            });
        }
        let id = job.id;
        entries.push(Entry {
            job,
            state: JobState::Queued,
        });
        Ok(EnqueueOutcome::Enqueued(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROPAGATION_TASK;
    use streamsync_protocol::Record;

    fn job(site: &str, name: &str) -> PropagationJob {
        let context = SiteContext::new(site);
        PropagationJob {
            id: Uuid::new_v4(),
            task: DEFAULT_PROPAGATION_TASK.to_string(),
            queue: QueueClass::Default,
            idempotency_key: idempotency_key(
                &context,
                DEFAULT_PROPAGATION_TASK,
                "Item",
                name,
                UpdateType::Create,
            ),
            context,
            doctype: "Item".to_string(),
            args: PropagationArgs {
                document: Record::named(name),
                update_type: UpdateType::Create,
            },
            enqueue_after_commit: true,
        }
    }

    #[test]
    fn key_is_stable_hex() {
        let ctx = SiteContext::new("hub.local");
        let a = idempotency_key(&ctx, "t", "Item", "I-1", UpdateType::Create);
        let b = idempotency_key(&ctx, "t", "Item", "I-1", UpdateType::Create);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(a, idempotency_key(&ctx, "t", "Item", "I-1", UpdateType::Update));
        assert_ne!(
            a,
            idempotency_key(&SiteContext::new("other"), "t", "Item", "I-1", UpdateType::Create)
        );
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let queue = MemoryJobQueue::new();
        let first = job("hub.local", "I-1");
        let first_id = first.id;
        assert_eq!(
            queue.enqueue_unique(first).unwrap(),
            EnqueueOutcome::Enqueued(first_id)
        );
        assert_eq!(
            queue.enqueue_unique(job("hub.local", "I-1")).unwrap(),
            EnqueueOutcome::Duplicate { existing: first_id }
        );
        // Same document on another site is a separate job
        assert!(queue
            .enqueue_unique(job("other.local", "I-1"))
            .unwrap()
            .is_enqueued());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn worker_lifecycle() {
        let queue = MemoryJobQueue::new();
        let ctx = SiteContext::new("hub.local");
        queue.enqueue_unique(job("hub.local", "I-1")).unwrap();

        let taken = queue.take_next(&ctx).unwrap().unwrap();
        assert_eq!(queue.jobs(&ctx)[0].1, JobState::Running);
        assert!(queue.take_next(&ctx).unwrap().is_none());

        // Running jobs still block duplicates
        assert!(!queue
            .enqueue_unique(job("hub.local", "I-1"))
            .unwrap()
            .is_enqueued());

        assert!(queue.complete(taken.id).unwrap());
        assert!(!queue.complete(taken.id).unwrap());
        assert!(queue.pending_jobs(&ctx).unwrap().is_empty());
        assert!(queue
            .enqueue_unique(job("hub.local", "I-1"))
            .unwrap()
            .is_enqueued());
    }

    #[test]
    fn job_serializes_for_workers() {
        let value = serde_json::to_value(job("hub.local", "I-1")).unwrap();
        assert_eq!(value["task"], "stream_sync.propagate");
        assert_eq!(value["queue"], "default");
        assert_eq!(value["context"], "hub.local");
        assert_eq!(value["args"]["document"]["name"], "I-1");
        assert_eq!(value["args"]["update_type"], "Create");
    }

    #[test]
    fn unavailable_queue_errors() {
        let queue = MemoryJobQueue::new();
        queue.set_available(false);
        let err = queue
            .pending_jobs(&SiteContext::new("hub.local"))
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(queue.enqueue_unique(job("hub.local", "I-1")).is_err());
    }
}
