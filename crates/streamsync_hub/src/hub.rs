//! Operator entry points.

use crate::config::StreamConfig;
use crate::dispatcher::{DispatchSummary, SyncDispatcher};
use crate::error::{HubError, HubResult};
use crate::lookup::search_doctypes;
use crate::queue::JobQueue;
use crate::registry::ConsumerRegistry;
use std::sync::Arc;
use streamsync_engine::{DiffConfig, DiffEngine, DiffReport, DocumentStore};
use streamsync_protocol::{DiffEntry, SiteContext, SyncPayload, SyncStatus};
use tracing::{debug, info, info_span};

/// The reconciliation hub.
///
/// Compares the producer store against every consumer with a manual rule
/// for a doctype, and dispatches the entries an operator selects.
pub struct SyncHub {
    config: StreamConfig,
    engine: DiffEngine<Arc<dyn DocumentStore>>,
    registry: Arc<dyn ConsumerRegistry>,
    dispatcher: SyncDispatcher<Arc<dyn JobQueue>>,
}

impl SyncHub {
    /// Creates a hub.
    pub fn new(
        config: StreamConfig,
        producer: Arc<dyn DocumentStore>,
        registry: Arc<dyn ConsumerRegistry>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let dispatcher = SyncDispatcher::new(queue, config.dispatch.clone());
        Self {
            engine: DiffEngine::new(producer, DiffConfig::new()),
            config,
            registry,
            dispatcher,
        }
    }

    /// Replaces the diff configuration.
    pub fn with_diff_config(mut self, diff_config: DiffConfig) -> Self {
        let producer = Arc::clone(self.engine.producer());
        self.engine = DiffEngine::new(producer, diff_config);
        self
    }

    /// The hub configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The producer store.
    pub fn producer(&self) -> &Arc<dyn DocumentStore> {
        self.engine.producer()
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &SyncDispatcher<Arc<dyn JobQueue>> {
        &self.dispatcher
    }

    /// Reconciles every manual rule for `ref_doctype`, in consumer order.
    pub fn get_report(&self, ref_doctype: &str) -> HubResult<DiffReport> {
        if ref_doctype.trim().is_empty() {
            return Err(HubError::InvalidRequest("ref_doctype is required".into()));
        }

        let mut report = DiffReport::default();
        for (consumer, rule) in self.config.manual_rules(ref_doctype) {
            let _span = info_span!("reconcile", consumer = %consumer.name, doctype = ref_doctype)
                .entered();
            let site = self.registry.consumer_site(&consumer.name)?;
            let consumer_report = self
                .engine
                .run_rule(ref_doctype, &rule.to_rule(), site.as_ref())?;
            debug!(entries = consumer_report.entries.len(), "consumer reconciled");
            report.merge(consumer_report);
        }

        info!(
            doctype = ref_doctype,
            entries = report.entries.len(),
            diagnostics = report.diagnostics.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Discrepancies for `ref_doctype` across all consumers.
    pub fn get_data(&self, ref_doctype: &str) -> HubResult<Vec<DiffEntry>> {
        Ok(self.get_report(ref_doctype)?.entries)
    }

    /// Schedules propagation of the selected entries.
    pub fn sync(&self, context: &SiteContext, payload: &SyncPayload) -> HubResult<SyncStatus> {
        self.dispatch(context, payload)?;
        Ok(SyncStatus::Success)
    }

    /// Like [`SyncHub::sync`], returning what was scheduled.
    pub fn dispatch(
        &self,
        context: &SiteContext,
        payload: &SyncPayload,
    ) -> HubResult<DispatchSummary> {
        if payload.ref_doctype.trim().is_empty() {
            return Err(HubError::InvalidRequest("ref_doctype is required".into()));
        }
        self.dispatcher.dispatch_keyed(
            context,
            self.engine.producer().as_ref(),
            &payload.ref_doctype,
            self.engine.config().identity_key(&payload.ref_doctype),
            &payload.sync_hub_document,
        )
    }

    /// Decodes a JSON payload and schedules it.
    pub fn sync_json(&self, context: &SiteContext, json: &str) -> HubResult<SyncStatus> {
        let payload = SyncPayload::from_json(json)?;
        self.sync(context, &payload)
    }

    /// Doctypes available for reconciliation, see [`search_doctypes`].
    pub fn get_doctype_sync(&self, txt: &str, start: usize, page_len: usize) -> Vec<String> {
        search_doctypes(&self.config, txt, start, page_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryJobQueue;
    use crate::registry::StaticRegistry;
    use streamsync_engine::MemoryStore;
    use streamsync_protocol::{Record, UpdateType};

    const CONFIG: &str = r#"
[[consumers]]
name = "east"
[[consumers.doctypes]]
ref_doctype = "Sales Invoice"
stream_type = "Manual"
condition = 'doc.company == "ACME"'

[[consumers]]
name = "west"
[[consumers.doctypes]]
ref_doctype = "Sales Invoice"
stream_type = "Manual"
[[consumers.doctypes]]
ref_doctype = "Item"
stream_type = "Realtime"
"#;

    fn invoice(name: &str, company: &str) -> Record {
        Record::named(name)
            .with("company", company)
            .with("docstatus", 1)
    }

    struct Fixture {
        hub: SyncHub,
        queue: Arc<MemoryJobQueue>,
    }

    fn fixture() -> Fixture {
        let producer = Arc::new(MemoryStore::new());
        producer.insert("Sales Invoice", invoice("SINV-1", "ACME"));
        producer.insert("Sales Invoice", invoice("SINV-2", "Globex"));

        let east = Arc::new(MemoryStore::new());
        east.insert("Sales Invoice", invoice("SINV-1", "ACME"));
        let west = Arc::new(MemoryStore::new());

        let registry = StaticRegistry::new()
            .with_site("east", east)
            .with_site("west", west);
        let queue = Arc::new(MemoryJobQueue::new());
        let hub = SyncHub::new(
            StreamConfig::from_toml_str(CONFIG).unwrap(),
            producer,
            Arc::new(registry),
            queue.clone(),
        );
        Fixture { hub, queue }
    }

    #[test]
    fn results_accumulate_in_consumer_order() {
        let Fixture { hub, .. } = fixture();
        let entries = hub.get_data("Sales Invoice").unwrap();
        // east has SINV-1 and only cares about ACME; west has nothing
        assert_eq!(
            entries,
            vec![DiffEntry::create("SINV-1"), DiffEntry::create("SINV-2")]
        );
        assert!(hub.get_data("Item").unwrap().is_empty());
    }

    #[test]
    fn unknown_consumer_fails_reconciliation() {
        let producer: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let hub = SyncHub::new(
            StreamConfig::from_toml_str(CONFIG).unwrap(),
            producer,
            Arc::new(StaticRegistry::new()),
            Arc::new(MemoryJobQueue::new()),
        );
        assert!(matches!(
            hub.get_data("Sales Invoice"),
            Err(HubError::UnknownConsumer(_))
        ));
    }

    #[test]
    fn blank_doctype_is_rejected() {
        let Fixture { hub, .. } = fixture();
        let err = hub.get_data("  ").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn sync_json_schedules_jobs() {
        let Fixture { hub, queue } = fixture();
        let ctx = SiteContext::new("hub.local");
        let json = r#"{
            "ref_doctype": "Sales Invoice",
            "sync_hub_document": [{"document": "SINV-2", "update_type": "Create"}]
        }"#;

        assert_eq!(hub.sync_json(&ctx, json).unwrap(), SyncStatus::Success);
        let jobs = queue.jobs(&ctx);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].0.args.document.get_str("company").as_deref(), Some("Globex"));
        assert_eq!(jobs[0].0.args.update_type, UpdateType::Create);
    }

    #[test]
    fn malformed_payload_is_client_error() {
        let Fixture { hub, queue } = fixture();
        let err = hub
            .sync_json(&SiteContext::new("hub.local"), "{")
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(queue.is_empty());
    }

    #[test]
    fn doctype_lookup() {
        let Fixture { hub, .. } = fixture();
        assert_eq!(hub.get_doctype_sync("inv", 0, 10), vec!["Sales Invoice"]);
    }
}
