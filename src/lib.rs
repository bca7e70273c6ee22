//! # Activity Margin Builder
//!
//! A library for reconciling a small business's activity **Configuration** table (prices,
//! baseline enrollment, fixed material cost, staff rates) with its sparse, dated
//! **Usage Log** (hours worked, occasional attendance counts) into monthly margins per
//! activity, per category and cumulatively over time.
//!
//! ## Core Concepts
//!
//! - **Snapshot**: the raw tables of a workbook, captured once by the caller and never refetched
//! - **Classification**: which raw table is the Configuration and which the Usage Log,
//!   decided by column signatures with configurable header synonyms
//! - **Join Key**: trimmed, upper-cased activity name shared by both tables
//! - **Forward Fill**: a log entry without an attendance figure reuses the last explicit
//!   figure for that activity, or the Configuration baseline if there is none yet
//! - **Treasury**: the sum of every period's margin over the full history
//!
//! ## Example
//!
//! ```rust,ignore
//! use activity_margin_builder::*;
//!
//! let snapshot = SourceSnapshot::capture(&CsvFileSource::new(["config.csv", "registre.csv"]))?;
//! let processor = ReconciliationProcessor::new(ReconcileConfig::default())?;
//!
//! // Most recent period
//! let report = processor.process(&snapshot, None)?;
//! println!("{}: margin {:.2}", report.selected_period.unwrap(), report.totals.margin);
//! println!("Treasury: {:.2}", report.treasury);
//!
//! // A specific month
//! let march = processor.process(&snapshot, Some("2025-03".parse()?))?;
//! ```

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod numeric;
pub mod period;
pub mod reconciler;
pub mod report;
pub mod schema;
pub mod source;
pub mod utils;

pub use classifier::{classify_tables, find_column, TableClassification, TableClassifier, TableRole};
pub use config::{ColumnSynonyms, DateConfig, ReconcileConfig};
pub use engine::{category_rollup, compute_activity, period_delta, summarize, top_by_margin, MarginEngine};
pub use error::{ReconciliationError, Result};
pub use export::{write_activities_csv, write_history_csv};
pub use ingestion::{ActivityCatalog, IngestionStats, TableIngestor, UnparsableDate, UsageLog};
pub use numeric::{parse_number, NumberParseError, NumericNormalizer};
pub use period::{
    distinct_periods_desc, period_of, previous_period, try_parse_date, try_period_of,
    DateParseError, PeriodKey,
};
pub use reconciler::{AttendanceLedger, AttendanceReconciler, AttendanceSlot};
pub use report::{DataQualityReport, ReconciliationReport};
pub use schema::*;
pub use source::{read_csv_table, CsvFileSource, SourceSnapshot, TableSource};
pub use utils::{normalize_header, normalize_key};

use log::{debug, info, warn};

pub struct ReconciliationProcessor {
    config: ReconcileConfig,
}

impl ReconciliationProcessor {
    pub fn new(config: ReconcileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Runs the full pipeline over one snapshot.
    ///
    /// `period` selects the month shown in the per-activity view; `None` picks the most
    /// recent one. History and treasury always cover every period regardless of the
    /// selection. Holds no state between calls.
    pub fn process(
        &self,
        snapshot: &SourceSnapshot,
        period: Option<PeriodKey>,
    ) -> Result<ReconciliationReport> {
        info!(
            "Reconciling snapshot with {} candidate tables",
            snapshot.tables.len()
        );

        let classification = TableClassifier::new(&self.config).classify(&snapshot.tables);
        let configuration = classification.configuration.ok_or(
            ReconciliationError::NoConfigurationTable {
                scanned: classification.scanned,
            },
        )?;

        let ingestor = TableIngestor::new(&self.config);
        let mut stats = IngestionStats::default();
        let catalog = ingestor.load_activities(configuration.table, &mut stats)?;

        let usage_log = match classification.usage_log {
            Some(usage) => ingestor.load_usage_log(usage.table, &mut stats)?,
            None => {
                warn!("No Usage Log table found; falling back to Configuration baselines");
                UsageLog::default()
            }
        };

        let ledger = AttendanceReconciler::new(&catalog).reconcile(&usage_log);
        let engine = MarginEngine::new(&catalog, &ledger);

        let available_periods = usage_log.periods_desc();
        let selected_period = match period {
            Some(p) if available_periods.contains(&p) => Some(p),
            Some(p) => return Err(ReconciliationError::UnknownPeriod(p.to_string())),
            None => available_periods.first().copied(),
        };
        debug!(
            "Available periods: {:?}; selected: {:?}",
            available_periods, selected_period
        );

        let activities = engine.compute_period(selected_period);
        let totals = summarize(selected_period, &activities);
        let categories = category_rollup(&activities);

        let history = engine.history(&available_periods);
        let treasury = history
            .last()
            .map(|point| point.cumulative_margin)
            .unwrap_or(0.0);

        let delta_vs_previous = selected_period
            .and_then(|selected| previous_period(&available_periods, selected))
            .and_then(|previous| history.iter().find(|h| h.totals.period == Some(previous)))
            .and_then(|previous| period_delta(&totals, &previous.totals));

        let data_quality = DataQualityReport {
            configuration_table: Some(configuration.table.name.clone()),
            usage_log_table: classification.usage_log.map(|u| u.table.name.clone()),
            usage_log_missing: classification.usage_log.is_none(),
            unmatched_records: ledger.unmatched_records(),
            unmatched_activities: ledger.unmatched_activities().clone(),
            ingestion: stats,
        };

        info!(
            "Reconciled {} activities over {} periods; treasury {:.2}",
            catalog.len(),
            available_periods.len(),
            treasury
        );

        Ok(ReconciliationReport {
            selected_period,
            available_periods,
            activities,
            categories,
            totals,
            delta_vs_previous,
            history,
            treasury,
            data_quality,
        })
    }

    /// Captures a snapshot from `source`, then processes it.
    pub fn process_source(
        &self,
        source: &dyn TableSource,
        period: Option<PeriodKey>,
    ) -> Result<ReconciliationReport> {
        let snapshot = SourceSnapshot::capture(source)?;
        self.process(&snapshot, period)
    }
}

pub fn reconcile_snapshot(
    snapshot: &SourceSnapshot,
    config: &ReconcileConfig,
    period: Option<PeriodKey>,
) -> Result<ReconciliationReport> {
    ReconciliationProcessor::new(config.clone())?.process(snapshot, period)
}
