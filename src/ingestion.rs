use crate::classifier::find_column;
use crate::config::ReconcileConfig;
use crate::error::{ReconciliationError, Result};
use crate::numeric::NumericNormalizer;
use crate::period::{distinct_periods_desc, try_parse_date, PeriodKey};
use crate::schema::{ActivityConfig, Cell, RawTable, UsageRecord};
use crate::utils::normalize_key;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UnparsableDate {
    pub source_row: usize,
    pub raw: String,
}

/// Row-level problems found while typing the raw tables. Nothing here aborts a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct IngestionStats {
    pub configuration_rows: usize,
    pub usage_rows: usize,
    /// Rows whose activity cell was blank.
    pub blank_key_rows: usize,
    /// Keys defined more than once in the Configuration table; the last row won.
    pub duplicate_activities: Vec<String>,
    pub negative_values_clamped: usize,
    pub unparsable_dates: Vec<UnparsableDate>,
}

/// Configuration entities keyed by join key. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ActivityCatalog {
    activities: BTreeMap<String, ActivityConfig>,
}

impl ActivityCatalog {
    /// Builds a catalog with last-one-wins semantics for repeated keys.
    pub fn from_activities<I>(activities: I) -> Self
    where
        I: IntoIterator<Item = ActivityConfig>,
    {
        let mut map = BTreeMap::new();
        for activity in activities {
            map.insert(activity.activity_id.clone(), activity);
        }
        Self { activities: map }
    }

    pub fn get(&self, activity_id: &str) -> Option<&ActivityConfig> {
        self.activities.get(activity_id)
    }

    pub fn contains(&self, activity_id: &str) -> bool {
        self.activities.contains_key(activity_id)
    }

    /// Activities in join-key order.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityConfig> {
        self.activities.values()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Distinct category labels, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .activities
            .values()
            .filter_map(|a| a.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Usage Log records ordered by date ascending. Records with unparsable dates sort last
/// and keep their table order.
#[derive(Debug, Clone, Default)]
pub struct UsageLog {
    records: Vec<UsageRecord>,
}

impl UsageLog {
    pub fn from_records(mut records: Vec<UsageRecord>) -> Self {
        // Stable: same-day records keep table order, which forward-fill relies on.
        records.sort_by_key(|r| (r.date.is_none(), r.date));
        Self { records }
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every period with at least one dated record, most recent first.
    pub fn periods_desc(&self) -> Vec<PeriodKey> {
        distinct_periods_desc(self.records.iter().filter_map(|r| r.period))
    }
}

/// Turns classified raw tables into typed Configuration and Usage Log data.
pub struct TableIngestor<'a> {
    config: &'a ReconcileConfig,
    numbers: NumericNormalizer,
}

impl<'a> TableIngestor<'a> {
    pub fn new(config: &'a ReconcileConfig) -> Self {
        Self {
            config,
            numbers: NumericNormalizer::new(&config.currency_symbols),
        }
    }

    pub fn load_activities(
        &self,
        table: &RawTable,
        stats: &mut IngestionStats,
    ) -> Result<ActivityCatalog> {
        let columns = &self.config.columns;
        let activity_col = require_column(table, &columns.activity, "activity")?;
        let price_col = require_column(table, &columns.unit_price, "unit_price")?;
        let enrollment_col =
            require_column(table, &columns.baseline_enrollment, "baseline_enrollment")?;
        let category_col = find_column(&table.headers, &columns.category);
        let material_col = find_column(&table.headers, &columns.fixed_material_cost);
        let rate_col = find_column(&table.headers, &columns.hourly_staff_rate);

        let mut activities: BTreeMap<String, ActivityConfig> = BTreeMap::new();

        for row in 0..table.rows.len() {
            stats.configuration_rows += 1;

            let name = table.cell(row, activity_col).as_text().trim().to_string();
            if name.is_empty() {
                stats.blank_key_rows += 1;
                continue;
            }
            let activity_id = normalize_key(&name);

            let category = category_col
                .map(|c| table.cell(row, c).as_text().trim().to_string())
                .filter(|c| !c.is_empty());

            let activity = ActivityConfig {
                activity_id: activity_id.clone(),
                name,
                category,
                unit_price: self.amount(table, row, Some(price_col), stats),
                baseline_enrollment: self.amount(table, row, Some(enrollment_col), stats),
                fixed_material_cost: self.amount(table, row, material_col, stats),
                hourly_staff_rate: self.amount(table, row, rate_col, stats),
            };

            if activities.insert(activity_id.clone(), activity).is_some() {
                warn!(
                    "Activity '{}' is defined more than once; row {} replaces the earlier definition",
                    activity_id, row
                );
                if !stats.duplicate_activities.contains(&activity_id) {
                    stats.duplicate_activities.push(activity_id);
                }
            }
        }

        debug!(
            "Loaded {} activities from table '{}'",
            activities.len(),
            table.name
        );

        Ok(ActivityCatalog { activities })
    }

    pub fn load_usage_log(&self, table: &RawTable, stats: &mut IngestionStats) -> Result<UsageLog> {
        let columns = &self.config.columns;
        let activity_col = require_column(table, &columns.activity, "activity")?;
        let date_col = require_column(table, &columns.date, "date")?;
        let hours_col = require_column(table, &columns.hours, "hours")?;
        let enrollment_col = find_column(&table.headers, &columns.reported_enrollment);

        let mut records = Vec::with_capacity(table.rows.len());

        for row in 0..table.rows.len() {
            stats.usage_rows += 1;

            let name = table.cell(row, activity_col).as_text();
            if name.trim().is_empty() {
                stats.blank_key_rows += 1;
                continue;
            }

            let date_cell = table.cell(row, date_col);
            let date = match try_parse_date(date_cell, &self.config.dates) {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!("Usage Log row {}: {}; row excluded from periods", row, e);
                    stats.unparsable_dates.push(UnparsableDate {
                        source_row: row,
                        raw: date_cell.as_text(),
                    });
                    None
                }
            };

            let reported_enrollment = enrollment_col.and_then(|c| {
                self.numbers
                    .try_parse(table.cell(row, c))
                    .ok()
                    .map(|v| clamp_non_negative(v, stats))
            });

            records.push(UsageRecord {
                activity_id: normalize_key(&name),
                source_row: row,
                raw_date: date_cell.as_text(),
                date,
                period: date.map(PeriodKey::from_date),
                hours: self.amount(table, row, Some(hours_col), stats),
                reported_enrollment,
            });
        }

        debug!(
            "Loaded {} usage records from table '{}'",
            records.len(),
            table.name
        );

        Ok(UsageLog::from_records(records))
    }

    fn amount(
        &self,
        table: &RawTable,
        row: usize,
        column: Option<usize>,
        stats: &mut IngestionStats,
    ) -> f64 {
        match column {
            Some(c) => clamp_non_negative(self.numbers.parse(table.cell(row, c)), stats),
            None => 0.0,
        }
    }
}

fn clamp_non_negative(value: f64, stats: &mut IngestionStats) -> f64 {
    if value < 0.0 {
        stats.negative_values_clamped += 1;
        0.0
    } else {
        value
    }
}

fn require_column(table: &RawTable, synonyms: &[String], label: &str) -> Result<usize> {
    find_column(&table.headers, synonyms).ok_or_else(|| ReconciliationError::MissingColumn {
        table: table.name.clone(),
        column: label.to_string(),
    })
}

/// Convenience for callers building a Usage Log cell by cell.
pub fn text_cells(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::from(*v)).collect()
}
