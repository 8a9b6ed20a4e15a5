//! Producer/consumer diffing.
//!
//! A rule is reconciled in two phases that append to one result list:
//!
//! 1. **New records** — current (unamended) producer documents whose identity
//!    key is absent from the consumer become `Create` entries.
//! 2. **Outdated records** — submitted producer amendments whose consumer
//!    counterpart was last modified earlier become `Update` entries.

use crate::chain::ChainResolver;
use crate::condition::{parse_condition, ConditionDiagnostic};
use crate::config::{AmendMode, DiffConfig, ReconRule};
use crate::error::{EngineError, EngineResult};
use crate::store::DocumentStore;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use streamsync_protocol::{
    DiffEntry, FieldValue, FilterSet, Filters, ListQuery, Predicate, Record, AMENDED_FROM_FIELD,
    DOCSTATUS_FIELD, DOCSTATUS_SUBMITTED, MODIFIED_FIELD, NAME_FIELD,
};
use tracing::{debug, info};

/// Counters collected while reconciling one rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Current producer documents matching the rule.
    pub producer_candidates: u64,
    /// Consumer documents matching the rule.
    pub consumer_matches: u64,
    /// Producer amendments compared against the consumer.
    pub amended_checked: u64,
    /// Amendments with no consumer counterpart.
    pub skipped_missing: u64,
}

impl DiffStats {
    fn merge(&mut self, other: DiffStats) {
        self.producer_candidates += other.producer_candidates;
        self.consumer_matches += other.consumer_matches;
        self.amended_checked += other.amended_checked;
        self.skipped_missing += other.skipped_missing;
    }
}

/// Result of reconciling one or more rules.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    /// Discrepancies in discovery order.
    pub entries: Vec<DiffEntry>,
    /// Condition problems, for operator visibility.
    pub diagnostics: Vec<ConditionDiagnostic>,
    /// Counters.
    pub stats: DiffStats,
}

impl DiffReport {
    /// Appends another report.
    pub fn merge(&mut self, other: DiffReport) {
        self.entries.extend(other.entries);
        self.diagnostics.extend(other.diagnostics);
        self.stats.merge(other.stats);
    }

    /// Returns true if no discrepancies were found.
    pub fn is_up_to_date(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes discrepancies between a producer store and consumer stores.
pub struct DiffEngine<P: DocumentStore> {
    producer: P,
    config: DiffConfig,
}

impl<P: DocumentStore> DiffEngine<P> {
    /// Creates an engine over a producer store.
    pub fn new(producer: P, config: DiffConfig) -> Self {
        Self { producer, config }
    }

    /// The producer store.
    pub fn producer(&self) -> &P {
        &self.producer
    }

    /// The engine configuration.
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Reconciles one rule against one consumer, using the doctype's
    /// configured identity key.
    pub fn run_rule<C: DocumentStore + ?Sized>(
        &self,
        ref_doctype: &str,
        rule: &ReconRule,
        consumer: &C,
    ) -> EngineResult<DiffReport> {
        let key = self.config.identity_key(ref_doctype).to_string();
        self.run_rule_with_key(ref_doctype, rule, consumer, &key)
    }

    /// Reconciles one rule and returns only the entries.
    pub fn compute_diff<C: DocumentStore + ?Sized>(
        &self,
        ref_doctype: &str,
        rule: &ReconRule,
        consumer: &C,
        key: &str,
    ) -> EngineResult<Vec<DiffEntry>> {
        Ok(self
            .run_rule_with_key(ref_doctype, rule, consumer, key)?
            .entries)
    }

    fn run_rule_with_key<C: DocumentStore + ?Sized>(
        &self,
        ref_doctype: &str,
        rule: &ReconRule,
        consumer: &C,
        key: &str,
    ) -> EngineResult<DiffReport> {
        let parsed = parse_condition(rule.condition.as_deref());
        let mut report = DiffReport {
            diagnostics: parsed.diagnostics,
            ..DiffReport::default()
        };

        let FilterSet {
            mut filters,
            or_filters,
        } = parsed.filters;

        self.new_records(ref_doctype, consumer, key, &mut filters, or_filters, &mut report)?;

        // Phase A leaves `filters` without docstatus; the amendment pass
        // builds on that and does not apply the OR-group.
        filters.insert(AMENDED_FROM_FIELD, Predicate::IsSet);
        filters.insert(
            DOCSTATUS_FIELD,
            Predicate::Eq(FieldValue::Int(DOCSTATUS_SUBMITTED)),
        );
        self.outdated_records(ref_doctype, rule.amend_mode, consumer, &filters, &mut report)?;

        info!(
            doctype = ref_doctype,
            entries = report.entries.len(),
            diagnostics = report.diagnostics.len(),
            "reconciled rule"
        );
        Ok(report)
    }

    fn new_records<C: DocumentStore + ?Sized>(
        &self,
        ref_doctype: &str,
        consumer: &C,
        key: &str,
        filters: &mut Filters,
        or_filters: Filters,
        report: &mut DiffReport,
    ) -> EngineResult<()> {
        let fields = identity_fields(key);
        filters.insert(AMENDED_FROM_FIELD, Predicate::IsNotSet);

        let producer_query = ListQuery::new(filters.clone())
            .with_or_filters(or_filters)
            .with_fields(fields.clone());
        let producer_data = self.producer.list(ref_doctype, &producer_query)?;

        // docstatus is a producer workflow field; consumers are not assumed
        // to mirror it.
        filters.remove(DOCSTATUS_FIELD);
        let consumer_query = ListQuery::new(filters.clone()).with_fields(fields);
        let consumer_data = consumer.list(ref_doctype, &consumer_query)?;

        let targets = consumer_data
            .iter()
            .map(|r| identity_of(ref_doctype, r, key))
            .collect::<EngineResult<HashSet<_>>>()?;

        let mut seen = HashSet::new();
        let mut created = 0usize;
        for record in &producer_data {
            let id = identity_of(ref_doctype, record, key)?;
            if !targets.contains(&id) && seen.insert(id.clone()) {
                report.entries.push(DiffEntry::create(id));
                created += 1;
            }
        }

        report.stats.producer_candidates += producer_data.len() as u64;
        report.stats.consumer_matches += consumer_data.len() as u64;
        debug!(
            doctype = ref_doctype,
            producer = producer_data.len(),
            consumer = consumer_data.len(),
            created,
            "compared current documents"
        );
        Ok(())
    }

    fn outdated_records<C: DocumentStore + ?Sized>(
        &self,
        ref_doctype: &str,
        amend_mode: AmendMode,
        consumer: &C,
        filters: &Filters,
        report: &mut DiffReport,
    ) -> EngineResult<()> {
        let query = ListQuery::new(filters.clone()).with_fields([
            NAME_FIELD,
            AMENDED_FROM_FIELD,
            MODIFIED_FIELD,
        ]);
        let amended = self.producer.list(ref_doctype, &query)?;
        let resolver = ChainResolver::new(&self.producer, ref_doctype);

        let mut updated = 0usize;
        for p_doc in &amended {
            let name = identity_of(ref_doctype, p_doc, NAME_FIELD)?;
            let source = match amend_mode {
                AmendMode::UpdateSource => resolver.resolve_root(p_doc)?,
                AmendMode::Default => name.clone(),
            };
            report.stats.amended_checked += 1;

            let lookup = Filters::new().with(NAME_FIELD, Predicate::Eq(FieldValue::Str(source)));
            let Some(c_doc) =
                consumer.get_value(ref_doctype, &[NAME_FIELD, MODIFIED_FIELD], &lookup)?
            else {
                report.stats.skipped_missing += 1;
                continue;
            };

            let consumer_modified = modified_of(ref_doctype, &c_doc)?;
            let producer_modified = modified_of(ref_doctype, p_doc)?;
            if consumer_modified < producer_modified {
                report.entries.push(DiffEntry::update(name));
                updated += 1;
            }
        }

        debug!(
            doctype = ref_doctype,
            amended = amended.len(),
            updated,
            skipped = report.stats.skipped_missing,
            "compared amended documents"
        );
        Ok(())
    }
}

fn identity_fields(key: &str) -> Vec<String> {
    if key == NAME_FIELD {
        vec![NAME_FIELD.to_string()]
    } else {
        vec![NAME_FIELD.to_string(), key.to_string()]
    }
}

fn identity_of(doctype: &str, record: &Record, key: &str) -> EngineResult<String> {
    record.get_str(key).ok_or_else(|| EngineError::MissingField {
        doctype: doctype.to_string(),
        field: key.to_string(),
    })
}

fn modified_of(doctype: &str, record: &Record) -> EngineResult<NaiveDateTime> {
    record.modified().ok_or_else(|| EngineError::InvalidTimestamp {
        doctype: doctype.to_string(),
        name: record.name().unwrap_or_default(),
        field: MODIFIED_FIELD,
        value: record.get_str(MODIFIED_FIELD),
    })
}
