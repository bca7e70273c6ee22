use crate::engine::top_by_margin;
use crate::ingestion::IngestionStats;
use crate::period::PeriodKey;
use crate::schema::{
    CategoryRollup, HistoryPoint, PeriodDelta, PeriodTotals, ReconciledActivityPeriod,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signals about the source data that did not stop the run but probably deserve a look.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DataQualityReport {
    pub configuration_table: Option<String>,
    pub usage_log_table: Option<String>,

    #[schemars(
        description = "True when no Usage Log table was found; figures are then a baseline projection"
    )]
    pub usage_log_missing: bool,

    #[schemars(description = "Usage Log records whose activity has no Configuration row")]
    pub unmatched_records: usize,

    pub unmatched_activities: BTreeMap<String, usize>,

    pub ingestion: IngestionStats,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        !self.usage_log_missing
            && self.unmatched_records == 0
            && self.ingestion.blank_key_rows == 0
            && self.ingestion.duplicate_activities.is_empty()
            && self.ingestion.negative_values_clamped == 0
            && self.ingestion.unparsable_dates.is_empty()
    }
}

/// Everything a rendering layer needs for one refresh, as plain records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReconciliationReport {
    #[schemars(description = "Period shown in `activities`; null for a baseline projection")]
    pub selected_period: Option<PeriodKey>,

    #[schemars(description = "Every period present in the Usage Log, most recent first")]
    pub available_periods: Vec<PeriodKey>,

    #[schemars(description = "One row per configured activity for the selected period")]
    pub activities: Vec<ReconciledActivityPeriod>,

    pub categories: Vec<CategoryRollup>,

    pub totals: PeriodTotals,

    #[schemars(description = "Change against the previous available period, if there is one")]
    pub delta_vs_previous: Option<PeriodDelta>,

    #[schemars(description = "Totals for every period, oldest first, with running treasury")]
    pub history: Vec<HistoryPoint>,

    #[schemars(description = "Cumulative margin over the full history")]
    pub treasury: f64,

    pub data_quality: DataQualityReport,
}

impl ReconciliationReport {
    /// Read-only view of the selected period's rows for one category.
    pub fn filter_by_category(&self, category: &str) -> Vec<&ReconciledActivityPeriod> {
        self.activities
            .iter()
            .filter(|row| row.category.as_deref() == Some(category))
            .collect()
    }

    /// Rows whose activity name, key or category contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<&ReconciledActivityPeriod> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.activities.iter().collect();
        }
        self.activities
            .iter()
            .filter(|row| {
                row.name.to_lowercase().contains(&needle)
                    || row.activity_id.to_lowercase().contains(&needle)
                    || row
                        .category
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn top_activities(&self, n: usize) -> Vec<&ReconciledActivityPeriod> {
        top_by_margin(&self.activities, n)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReconciliationReport)
    }
}
