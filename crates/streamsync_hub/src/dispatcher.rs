//! Propagation dispatch.
//!
//! Selected diff entries become propagation jobs. Jobs are staged in a
//! [`DispatchBatch`] and handed to the queue only when the batch commits;
//! a batch dropped without committing schedules nothing.

use crate::config::DispatchConfig;
use crate::error::HubResult;
use crate::queue::{idempotency_key, EnqueueOutcome, JobQueue, PropagationJob};
use std::collections::HashSet;
use std::mem;
use streamsync_engine::{DocumentStore, EngineError};
use streamsync_protocol::{
    DiffEntry, FieldValue, Filters, Predicate, PropagationArgs, Record, SiteContext, SyncStatus,
    UpdateType, NAME_FIELD,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a dispatch did with each entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Ids of newly scheduled jobs.
    pub scheduled: Vec<Uuid>,
    /// Entries already pending on the queue before the dispatch.
    pub skipped_pending: usize,
    /// Repeated entries within the same dispatch.
    pub skipped_duplicate: usize,
    /// Entries the queue rejected because a racing dispatch got there first.
    pub rejected: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: EnqueueOutcome) {
        match outcome {
            EnqueueOutcome::Enqueued(id) => self.scheduled.push(id),
            EnqueueOutcome::Duplicate { existing } => {
                debug!(%existing, "propagation already queued");
                self.rejected += 1;
            }
        }
    }
}

/// Schedules propagation jobs on a [`JobQueue`].
pub struct SyncDispatcher<Q: JobQueue> {
    queue: Q,
    config: DispatchConfig,
}

impl<Q: JobQueue> SyncDispatcher<Q> {
    /// Creates a dispatcher.
    pub fn new(queue: Q, config: DispatchConfig) -> Self {
        Self { queue, config }
    }

    /// The underlying queue.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// The dispatch configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Opens a batch for a site.
    ///
    /// The site's pending jobs are read once here. If the queue cannot be
    /// reached the batch proceeds as if nothing were pending and relies on
    /// [`JobQueue::enqueue_unique`] at commit.
    pub fn begin(&self, context: &SiteContext) -> DispatchBatch<'_, Q> {
        let pending = match self.queue.pending_jobs(context) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(site = %context, error = %e, "could not read pending jobs, assuming none");
                HashSet::new()
            }
        };
        DispatchBatch {
            dispatcher: self,
            context: context.clone(),
            pending,
            staged: Vec::new(),
            summary: DispatchSummary::default(),
        }
    }

    /// Schedules one job per selected entry and commits.
    ///
    /// Every entry's document is fetched from the producer by name; a missing
    /// document fails the whole dispatch before anything is enqueued.
    pub fn dispatch<S: DocumentStore + ?Sized>(
        &self,
        context: &SiteContext,
        producer: &S,
        ref_doctype: &str,
        entries: &[DiffEntry],
    ) -> HubResult<DispatchSummary> {
        self.dispatch_keyed(context, producer, ref_doctype, NAME_FIELD, entries)
    }

    /// [`SyncDispatcher::dispatch`] for a doctype matched on `identity_key`.
    ///
    /// `Create` entries carry the identity value, so the producer document is
    /// first located through that field. `Update` entries always carry names.
    pub fn dispatch_keyed<S: DocumentStore + ?Sized>(
        &self,
        context: &SiteContext,
        producer: &S,
        ref_doctype: &str,
        identity_key: &str,
        entries: &[DiffEntry],
    ) -> HubResult<DispatchSummary> {
        let mut batch = self.begin(context);
        for entry in entries {
            let document = fetch_document(producer, ref_doctype, identity_key, entry)?;
            batch.stage(ref_doctype, document, entry.update_type)?;
        }
        let summary = batch.commit()?;
        info!(
            site = %context,
            doctype = ref_doctype,
            selected = entries.len(),
            scheduled = summary.scheduled.len(),
            skipped_pending = summary.skipped_pending,
            skipped_duplicate = summary.skipped_duplicate,
            rejected = summary.rejected,
            "dispatched propagation jobs"
        );
        Ok(summary)
    }

    /// [`SyncDispatcher::dispatch`] reporting only the status.
    pub fn sync<S: DocumentStore + ?Sized>(
        &self,
        context: &SiteContext,
        producer: &S,
        ref_doctype: &str,
        entries: &[DiffEntry],
    ) -> HubResult<SyncStatus> {
        self.dispatch(context, producer, ref_doctype, entries)?;
        Ok(SyncStatus::Success)
    }

    fn build_job(
        &self,
        context: &SiteContext,
        doctype: &str,
        document: Record,
        update_type: UpdateType,
        key: String,
    ) -> PropagationJob {
        PropagationJob {
            id: Uuid::new_v4(),
            task: self.config.task.clone(),
            queue: self.config.queue,
            context: context.clone(),
            doctype: doctype.to_string(),
            args: PropagationArgs {
                document,
                update_type,
            },
            idempotency_key: key,
            enqueue_after_commit: self.config.enqueue_after_commit,
        }
    }
}

fn fetch_document<S: DocumentStore + ?Sized>(
    producer: &S,
    ref_doctype: &str,
    identity_key: &str,
    entry: &DiffEntry,
) -> HubResult<Record> {
    if identity_key == NAME_FIELD || entry.update_type != UpdateType::Create {
        return Ok(producer.get(ref_doctype, &entry.document)?);
    }
    let lookup = Filters::new().with(
        identity_key,
        Predicate::Eq(FieldValue::Str(entry.document.clone())),
    );
    let name = producer
        .get_value(ref_doctype, &[NAME_FIELD], &lookup)?
        .and_then(|found| found.name())
        .ok_or_else(|| EngineError::not_found(ref_doctype, &entry.document))?;
    debug!(
        doctype = ref_doctype,
        key = identity_key,
        value = %entry.document,
        %name,
        "resolved identity value"
    );
    Ok(producer.get(ref_doctype, &name)?)
}

/// Jobs staged by one dispatch, scheduled on [`DispatchBatch::commit`].
pub struct DispatchBatch<'a, Q: JobQueue> {
    dispatcher: &'a SyncDispatcher<Q>,
    context: SiteContext,
    pending: HashSet<String>,
    staged: Vec<PropagationJob>,
    summary: DispatchSummary,
}

impl<Q: JobQueue> DispatchBatch<'_, Q> {
    /// Site the batch dispatches to.
    pub fn context(&self) -> &SiteContext {
        &self.context
    }

    /// Jobs waiting for commit.
    pub fn staged(&self) -> &[PropagationJob] {
        &self.staged
    }

    /// Stages a propagation of `document`.
    ///
    /// Returns false when the same propagation is already pending or staged.
    /// With `enqueue_after_commit` disabled the job is enqueued immediately.
    pub fn stage(
        &mut self,
        doctype: &str,
        document: Record,
        update_type: UpdateType,
    ) -> HubResult<bool> {
        let name = document.name().unwrap_or_default();
        let config = &self.dispatcher.config;
        let key = idempotency_key(&self.context, &config.task, doctype, &name, update_type);

        if self.pending.contains(&key) {
            debug!(doctype, name = %name, %update_type, "propagation already pending");
            self.summary.skipped_pending += 1;
            return Ok(false);
        }
        if self.staged.iter().any(|j| j.idempotency_key == key) {
            self.summary.skipped_duplicate += 1;
            return Ok(false);
        }

        let job = self
            .dispatcher
            .build_job(&self.context, doctype, document, update_type, key);
        if config.enqueue_after_commit {
            self.staged.push(job);
        } else {
            self.pending.insert(job.idempotency_key.clone());
            let outcome = self.dispatcher.queue.enqueue_unique(job)?;
            self.summary.record(outcome);
        }
        Ok(true)
    }

    /// Hands staged jobs to the queue.
    pub fn commit(mut self) -> HubResult<DispatchSummary> {
        for job in mem::take(&mut self.staged) {
            let outcome = self.dispatcher.queue.enqueue_unique(job)?;
            self.summary.record(outcome);
        }
        Ok(mem::take(&mut self.summary))
    }

    /// Discards staged jobs. Returns how many were dropped.
    pub fn rollback(mut self) -> usize {
        mem::take(&mut self.staged).len()
    }
}

impl<Q: JobQueue> Drop for DispatchBatch<'_, Q> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            warn!(
                site = %self.context,
                discarded = self.staged.len(),
                "dispatch batch dropped without commit"
            );
        }
    }
}
