//! Reconciles two CSV exports (Configuration first, Usage Log second) and prints the
//! selected month, the category rollup and the treasury.
//!
//! ```text
//! cargo run --example monthly_report -- config.csv registre.csv [YYYY-MM]
//! ```

use activity_margin_builder::*;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        anyhow::bail!("usage: monthly_report <config.csv> <usage-log.csv> [YYYY-MM]");
    }

    let period = args.get(2).map(|p| p.parse::<PeriodKey>()).transpose()?;
    let source = CsvFileSource::new(&args[..2]);
    let processor = ReconciliationProcessor::new(ReconcileConfig::default())?;
    let report = processor.process_source(&source, period)?;

    match report.selected_period {
        Some(p) => println!("Period {}", p),
        None => println!("Baseline projection (no usage log)"),
    }
    println!(
        "Revenue {:.2} | Costs {:.2} | Margin {:.2} ({:.1} %)",
        report.totals.revenue,
        report.totals.total_cost,
        report.totals.margin,
        report.totals.margin_ratio * 100.0
    );
    if let Some(delta) = &report.delta_vs_previous {
        println!("Margin vs {}: {:+.2}", delta.previous, delta.margin);
    }

    println!("\nTop activities:");
    for row in report.top_activities(5) {
        println!("  {:<24} {:>10.2}", row.name, row.margin);
    }

    println!("\nBy category:");
    for rollup in &report.categories {
        println!(
            "  {:<24} {:>10.2}",
            rollup.category.as_deref().unwrap_or("(none)"),
            rollup.margin
        );
    }

    println!("\nTreasury: {:.2}", report.treasury);

    if !report.data_quality.is_clean() {
        eprintln!(
            "\nData quality: {} unmatched log rows, {} unparsable dates",
            report.data_quality.unmatched_records,
            report.data_quality.ingestion.unparsable_dates.len()
        );
    }

    print!("\n{}", report.activities_to_csv()?);
    Ok(())
}
