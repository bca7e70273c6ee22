use crate::config::DateConfig;
use crate::error::{ReconciliationError, Result};
use crate::schema::Cell;
use crate::utils::last_day_of_month;
use chrono::{Datelike, Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Spreadsheet day serials count from 1899-12-30; the upper bound is 9999-12-31.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const MAX_SERIAL: f64 = 2_958_465.0;

/// Calendar month used as the aggregation granularity. Orders chronologically
/// and renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> NaiveDate {
        last_day_of_month(self.year, self.month)
    }

    /// The calendar month immediately before this one.
    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = ReconciliationError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let start = NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
            .map_err(|_| ReconciliationError::InvalidPeriod(s.to_string()))?;
        Ok(Self::from_date(start))
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = ReconciliationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(value: PeriodKey) -> Self {
        value.to_string()
    }
}

impl JsonSchema for PeriodKey {
    fn schema_name() -> String {
        "PeriodKey".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateParseError {
    #[error("empty date cell")]
    Empty,

    #[error("unrecognized date '{0}'")]
    Unrecognized(String),

    #[error("spreadsheet serial {0} is out of range")]
    SerialOutOfRange(f64),
}

/// Parses a Usage Log date cell.
///
/// Text is tried against [`DateConfig::effective_formats`]; if that fails and the text
/// carries a time part (`"03/04/2025 10:00"`, `"2025-04-03T10:00:00"`), the date part alone
/// is retried. Numeric cells are spreadsheet day serials.
pub fn try_parse_date(
    cell: &Cell,
    dates: &DateConfig,
) -> std::result::Result<NaiveDate, DateParseError> {
    match cell {
        Cell::Empty => Err(DateParseError::Empty),
        Cell::Number(serial) => from_spreadsheet_serial(*serial),
        Cell::Text(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(DateParseError::Empty);
            }

            let formats = dates.effective_formats();
            if let Some(date) = parse_with_formats(text, &formats) {
                return Ok(date);
            }

            let date_part = text.split(|c: char| c.is_whitespace() || c == 'T').next();
            match date_part {
                Some(part) if part != text => parse_with_formats(part, &formats)
                    .ok_or_else(|| DateParseError::Unrecognized(raw.clone())),
                _ => Err(DateParseError::Unrecognized(raw.clone())),
            }
        }
    }
}

fn parse_with_formats(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn from_spreadsheet_serial(serial: f64) -> std::result::Result<NaiveDate, DateParseError> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL {
        return Err(DateParseError::SerialOutOfRange(serial));
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|epoch| epoch.checked_add_days(Days::new(serial.floor() as u64)))
        .ok_or(DateParseError::SerialOutOfRange(serial))
}

pub fn try_period_of(
    cell: &Cell,
    dates: &DateConfig,
) -> std::result::Result<PeriodKey, DateParseError> {
    try_parse_date(cell, dates).map(PeriodKey::from_date)
}

/// Period of a raw date string; `None` is the "unparsable" sentinel.
pub fn period_of(raw: &str, dates: &DateConfig) -> Option<PeriodKey> {
    try_period_of(&Cell::from(raw), dates).ok()
}

/// Distinct periods, most recent first.
pub fn distinct_periods_desc<I>(periods: I) -> Vec<PeriodKey>
where
    I: IntoIterator<Item = PeriodKey>,
{
    let mut distinct: Vec<PeriodKey> = periods.into_iter().collect();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();
    distinct
}

/// The most recent available period strictly before `selected`.
///
/// This is the previous period *in the data*, not the previous calendar month:
/// a gap month with no log records is skipped.
pub fn previous_period(available: &[PeriodKey], selected: PeriodKey) -> Option<PeriodKey> {
    available.iter().copied().filter(|p| *p < selected).max()
}
