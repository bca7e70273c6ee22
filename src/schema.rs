use crate::period::PeriodKey;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single spreadsheet cell as delivered by a source connector.
///
/// Untagged so that JSON numbers stay native numbers and `null` becomes [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Textual rendering used for identifiers and diagnostics.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// A worksheet in normalized row/column form. Rows may be shorter than the header
/// row; missing trailing cells read as [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ActivityConfig {
    #[schemars(description = "Join key: trimmed, upper-cased activity name")]
    pub activity_id: String,

    #[schemars(description = "Activity name as written in the Configuration table (trimmed)")]
    pub name: String,

    pub category: Option<String>,

    #[schemars(description = "Price charged per enrolled participant")]
    pub unit_price: f64,

    #[schemars(description = "Participant count used when no period-specific figure exists")]
    pub baseline_enrollment: f64,

    #[schemars(description = "Recurring cost independent of hours worked, charged once per period")]
    pub fixed_material_cost: f64,

    #[schemars(description = "Cost per hour of staff time")]
    pub hourly_staff_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UsageRecord {
    pub activity_id: String,

    /// Zero-based row index in the source Usage Log table.
    pub source_row: usize,

    /// The date cell exactly as it appeared in the source.
    pub raw_date: String,

    pub date: Option<NaiveDate>,

    /// `None` when the date could not be parsed; such records take no part in
    /// period aggregation.
    pub period: Option<PeriodKey>,

    pub hours: f64,

    pub reported_enrollment: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EnrollmentOrigin {
    /// Explicit figure from a Usage Log record in this period
    Reported,
    /// Carried forward from an earlier explicit figure for the same activity
    CarriedForward,
    /// Configuration baseline (no explicit figure seen yet, or no records in the period)
    Baseline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReconciledActivityPeriod {
    pub activity_id: String,
    pub name: String,
    pub category: Option<String>,

    #[schemars(description = "Month the figures belong to; null for a baseline projection")]
    pub period: Option<PeriodKey>,

    pub enrollment_effective: f64,
    pub enrollment_origin: EnrollmentOrigin,
    pub hours_total: f64,
    pub record_count: usize,

    pub revenue: f64,
    pub wage_cost: f64,
    pub material_cost: f64,
    pub margin: f64,
    pub margin_ratio: f64,
    pub unit_margin: f64,
}

impl ReconciledActivityPeriod {
    pub fn total_cost(&self) -> f64 {
        self.wage_cost + self.material_cost
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CategoryRollup {
    /// `None` groups activities without a category.
    pub category: Option<String>,
    pub activity_count: usize,
    pub revenue: f64,
    pub total_cost: f64,
    pub margin: f64,
    /// Recomputed from the summed totals, never summed itself.
    pub margin_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodTotals {
    pub period: Option<PeriodKey>,
    pub activity_count: usize,
    pub revenue: f64,
    pub wage_cost: f64,
    pub material_cost: f64,
    pub total_cost: f64,
    pub margin: f64,
    pub margin_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodDelta {
    pub current: PeriodKey,
    pub previous: PeriodKey,
    pub revenue: f64,
    pub total_cost: f64,
    pub margin: f64,
}

/// One point of the trend series: a period's totals plus the running treasury.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct HistoryPoint {
    pub totals: PeriodTotals,
    pub cumulative_margin: f64,
}
