use crate::config::{ColumnSynonyms, ReconcileConfig};
use crate::schema::RawTable;
use crate::utils::normalize_header;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TableRole {
    Configuration,
    UsageLog,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifiedTable<'a> {
    /// Position of the table in the candidate sequence.
    pub index: usize,
    pub table: &'a RawTable,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableClassification<'a> {
    pub configuration: Option<ClassifiedTable<'a>>,
    pub usage_log: Option<ClassifiedTable<'a>>,
    /// How many candidates were inspected before stopping.
    pub scanned: usize,
}

impl TableClassification<'_> {
    /// Role assigned to the candidate at `index`, if any.
    pub fn role_of(&self, index: usize) -> Option<TableRole> {
        if self.configuration.is_some_and(|c| c.index == index) {
            Some(TableRole::Configuration)
        } else if self.usage_log.is_some_and(|u| u.index == index) {
            Some(TableRole::UsageLog)
        } else {
            None
        }
    }
}

/// Index of the first header matching any synonym, compared in normalized form.
pub fn find_column(headers: &[String], synonyms: &[String]) -> Option<usize> {
    let wanted: Vec<String> = synonyms
        .iter()
        .map(|s| normalize_header(s))
        .filter(|s| !s.is_empty())
        .collect();

    headers
        .iter()
        .position(|h| wanted.contains(&normalize_header(h)))
}

/// Decides which raw table is the Configuration table and which is the Usage Log
/// by matching column signatures.
pub struct TableClassifier<'a> {
    columns: &'a ColumnSynonyms,
    max_candidates: usize,
}

impl<'a> TableClassifier<'a> {
    pub fn new(config: &'a ReconcileConfig) -> Self {
        Self {
            columns: &config.columns,
            max_candidates: config.max_candidate_tables,
        }
    }

    /// Price-per-participant column and an enrollment-count column.
    pub fn matches_configuration(&self, table: &RawTable) -> bool {
        find_column(&table.headers, &self.columns.unit_price).is_some()
            && find_column(&table.headers, &self.columns.baseline_enrollment).is_some()
    }

    /// Hours column and a date column.
    pub fn matches_usage_log(&self, table: &RawTable) -> bool {
        find_column(&table.headers, &self.columns.hours).is_some()
            && find_column(&table.headers, &self.columns.date).is_some()
    }

    /// Scans at most `max_candidate_tables` tables in order. The first match wins each
    /// role, a table fills at most one role (Configuration first), and scanning stops
    /// as soon as both roles are filled.
    pub fn classify<'t>(&self, candidates: &'t [RawTable]) -> TableClassification<'t> {
        let mut result = TableClassification::default();

        for (index, table) in candidates.iter().take(self.max_candidates).enumerate() {
            result.scanned = index + 1;

            if result.configuration.is_none() && self.matches_configuration(table) {
                debug!("Table #{} '{}' classified as Configuration", index, table.name);
                result.configuration = Some(ClassifiedTable { index, table });
            } else if result.usage_log.is_none() && self.matches_usage_log(table) {
                debug!("Table #{} '{}' classified as Usage Log", index, table.name);
                result.usage_log = Some(ClassifiedTable { index, table });
            } else {
                debug!(
                    "Table #{} '{}' matched no open role (headers: {:?})",
                    index, table.name, table.headers
                );
            }

            if result.configuration.is_some() && result.usage_log.is_some() {
                break;
            }
        }

        result
    }
}

pub fn classify_tables<'t>(
    candidates: &'t [RawTable],
    config: &ReconcileConfig,
) -> TableClassification<'t> {
    TableClassifier::new(config).classify(candidates)
}
