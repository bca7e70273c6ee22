use crate::error::Result;
use crate::report::ReconciliationReport;
use crate::schema::{HistoryPoint, ReconciledActivityPeriod};
use std::io::Write;

/// Writes activity rows as CSV, one line per row, with a header line.
pub fn write_activities_csv<W: Write>(rows: &[ReconciledActivityPeriod], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the trend series as CSV with money rounded to cents.
pub fn write_history_csv<W: Write>(history: &[HistoryPoint], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "period",
        "activity_count",
        "revenue",
        "wage_cost",
        "material_cost",
        "total_cost",
        "margin",
        "margin_ratio",
        "cumulative_margin",
    ])?;

    for point in history {
        let t = &point.totals;
        csv_writer.write_record([
            t.period.map(|p| p.to_string()).unwrap_or_default(),
            t.activity_count.to_string(),
            format!("{:.2}", t.revenue),
            format!("{:.2}", t.wage_cost),
            format!("{:.2}", t.material_cost),
            format!("{:.2}", t.total_cost),
            format!("{:.2}", t.margin),
            format!("{:.4}", t.margin_ratio),
            format!("{:.2}", point.cumulative_margin),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

impl ReconciliationReport {
    pub fn activities_to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        write_activities_csv(&self.activities, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn history_to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        write_history_csv(&self.history, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
