//! Integration tests for the reconciliation hub.

use streamsync_engine::DiffConfig;
use streamsync_hub::{
    DispatchConfig, HubError, JobQueue, JobState, QueueClass, StreamConfig, SyncDispatcher,
};
use streamsync_protocol::{DiffEntry, Record, SiteContext, SyncPayload, SyncStatus, UpdateType};
use streamsync_testkit::prelude::*;

fn site() -> SiteContext {
    SiteContext::new("hub.example.com")
}

#[test]
fn diff_then_sync_round() {
    let t = TestHub::sample();
    for name in ["SINV-1", "SINV-2"] {
        t.producer
            .insert(SALES_INVOICE, submitted(name).with("company", "ACME"));
    }
    t.producer
        .insert(SALES_INVOICE, submitted("SINV-3").with("company", "Globex"));
    t.consumer("branch-east")
        .insert(SALES_INVOICE, Record::named("SINV-1").with("company", "ACME"));

    let report = t.hub.get_report(SALES_INVOICE).unwrap();
    // branch-east first (ACME only), then branch-west (everything)
    assert_eq!(
        report.entries,
        vec![
            DiffEntry::create("SINV-2"),
            DiffEntry::create("SINV-1"),
            DiffEntry::create("SINV-2"),
            DiffEntry::create("SINV-3"),
        ]
    );

    let payload = SyncPayload::new(SALES_INVOICE, report.entries);
    assert_eq!(t.hub.sync(&site(), &payload).unwrap(), SyncStatus::Success);

    // Duplicates across consumers collapse to one job per document
    let jobs = t.queue.jobs(&site());
    let names: Vec<_> = jobs
        .iter()
        .filter_map(|(job, _)| job.args.document.name())
        .collect();
    assert_eq!(names, vec!["SINV-2", "SINV-1", "SINV-3"]);
}

#[test]
fn second_sync_with_one_pending_schedules_one_job() {
    let t = TestHub::sample();
    for name in ["SINV-1", "SINV-2"] {
        t.producer.insert(SALES_INVOICE, submitted(name));
    }

    let first = SyncPayload::new(SALES_INVOICE, vec![DiffEntry::create("SINV-1")]);
    t.hub.sync(&site(), &first).unwrap();
    assert_eq!(t.queue.len(), 1);

    let second = SyncPayload::new(
        SALES_INVOICE,
        vec![DiffEntry::create("SINV-1"), DiffEntry::create("SINV-2")],
    );
    let summary = t.hub.dispatch(&site(), &second).unwrap();
    assert_eq!(summary.scheduled.len(), 1);
    assert_eq!(summary.skipped_pending, 1);
    assert_eq!(t.queue.len(), 2);
}

#[test]
fn completed_job_can_be_scheduled_again() {
    let t = TestHub::sample();
    t.producer.insert(SALES_INVOICE, submitted("SINV-1"));
    let payload = SyncPayload::new(SALES_INVOICE, vec![DiffEntry::create("SINV-1")]);

    t.hub.sync(&site(), &payload).unwrap();
    let job = t.queue.take_next(&site()).unwrap().unwrap();
    assert_eq!(t.queue.jobs(&site())[0].1, JobState::Running);
    assert_eq!(job.args.update_type, UpdateType::Create);

    // Still running, so a repeat is skipped
    let summary = t.hub.dispatch(&site(), &payload).unwrap();
    assert!(summary.scheduled.is_empty());

    assert!(t.queue.complete(job.id).unwrap());
    let summary = t.hub.dispatch(&site(), &payload).unwrap();
    assert_eq!(summary.scheduled.len(), 1);
}

#[test]
fn amended_documents_are_updates() {
    let t = TestHub::sample();
    t.producer.insert(
        SALES_INVOICE,
        submitted("SINV-1").with("company", "ACME"),
    );
    t.producer.insert(
        SALES_INVOICE,
        amendment("SINV-1-1", "SINV-1", "2025-06-01 09:00:00").with("company", "ACME"),
    );
    for consumer in ["branch-east", "branch-west"] {
        t.consumer(consumer).insert(
            SALES_INVOICE,
            modified_at("SINV-1", "2025-05-01 09:00:00").with("company", "ACME"),
        );
    }

    // Only branch-east resolves the amendment to its source
    let entries = t.hub.get_data(SALES_INVOICE).unwrap();
    assert_eq!(entries, vec![DiffEntry::update("SINV-1-1")]);
}

#[test]
fn realtime_rules_are_not_reconciled() {
    let t = TestHub::sample();
    t.producer.insert("Customer", submitted("CUST-1"));
    assert!(t.hub.get_data("Customer").unwrap().is_empty());
}

#[test]
fn items_are_keyed_on_item_code() {
    let t = TestHub::sample();
    t.producer
        .insert("Item", submitted("ITEM-0001").with("item_code", "WIDGET"));
    t.producer
        .insert("Item", submitted("ITEM-0002").with("item_code", "GADGET"));
    // Consumer names the item differently but shares the code
    t.consumer("branch-west")
        .insert("Item", Record::named("WIDGET").with("item_code", "WIDGET"));

    assert_eq!(
        t.hub.get_data("Item").unwrap(),
        vec![DiffEntry::create("GADGET")]
    );
}

#[test]
fn item_creates_sync_by_item_code() {
    let t = TestHub::sample();
    t.producer
        .insert("Item", submitted("ITEM-0002").with("item_code", "GADGET"));

    let entries = t.hub.get_data("Item").unwrap();
    assert_eq!(entries, vec![DiffEntry::create("GADGET")]);

    let payload = SyncPayload::new("Item", entries);
    assert_eq!(t.hub.sync(&site(), &payload).unwrap(), SyncStatus::Success);

    let jobs = t.queue.jobs(&site());
    assert_eq!(jobs.len(), 1);
    let document = &jobs[0].0.args.document;
    assert_eq!(document.name().as_deref(), Some("ITEM-0002"));
    assert_eq!(document.get_str("item_code").as_deref(), Some("GADGET"));
}

#[test]
fn identity_key_override() {
    let t = TestHub::sample();
    let TestHub {
        hub,
        producer,
        consumers,
        ..
    } = t;
    let hub = hub.with_diff_config(DiffConfig::new().with_identity_key("Item", "name"));
    producer.insert("Item", submitted("ITEM-0001").with("item_code", "WIDGET"));
    consumers["branch-west"].insert("Item", Record::named("WIDGET").with("item_code", "WIDGET"));

    assert_eq!(
        hub.get_data("Item").unwrap(),
        vec![DiffEntry::create("ITEM-0001")]
    );
}

#[test]
fn config_loads_from_file() {
    let file = write_config(SAMPLE_CONFIG);
    let config = StreamConfig::load(&file.path).unwrap();
    assert_eq!(config.dispatch.queue, QueueClass::Default);
    assert_eq!(config.manual_doctypes().len(), 2);

    let missing = StreamConfig::load(file.path.with_file_name("absent.toml")).unwrap_err();
    assert!(matches!(missing, HubError::Io(_)));
}

#[test]
fn doctype_lookup_lists_manual_doctypes() {
    let t = TestHub::sample();
    assert_eq!(
        t.hub.get_doctype_sync("", 0, 20),
        vec!["Item", "Sales Invoice"]
    );
    assert_eq!(t.hub.get_doctype_sync("ITEM", 0, 20), vec!["Item"]);
}

#[test]
fn dispatcher_over_shared_queue() {
    let t = TestHub::sample();
    t.producer.insert(SALES_INVOICE, submitted("SINV-1"));

    // A second dispatcher sharing the hub's queue sees its pending jobs
    let other = SyncDispatcher::new(
        t.queue.clone(),
        DispatchConfig::new().with_queue(QueueClass::Long),
    );
    other
        .sync(
            &site(),
            t.producer.as_ref(),
            SALES_INVOICE,
            &[DiffEntry::create("SINV-1")],
        )
        .unwrap();

    let payload = SyncPayload::new(SALES_INVOICE, vec![DiffEntry::create("SINV-1")]);
    let summary = t.hub.dispatch(&site(), &payload).unwrap();
    assert!(summary.scheduled.is_empty());
    assert_eq!(t.queue.pending_jobs(&site()).unwrap().len(), 1);
    assert_eq!(t.queue.jobs(&site())[0].0.queue, QueueClass::Long);
}
