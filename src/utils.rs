use chrono::{Days, NaiveDate};

/// Canonical join key for an activity name: surrounding whitespace trimmed, upper-cased.
///
/// Internal whitespace and punctuation are left alone, so `"Futbol Sala"` and
/// `"Futbol  Sala"` stay distinct keys.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Canonical form of a column header used for synonym matching.
///
/// Trims the header, collapses every internal whitespace run into a single `_`
/// and lower-cases the result, so `" Preu  Alumne"`, `"Preu_Alumne"` and
/// `"preu alumne"` all compare equal.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(NaiveDate::MAX)
}

/// Ratio guarded against empty denominators: anything but a strictly positive
/// denominator yields 0.0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
