use activity_margin_builder::*;

const CONFIG_CSV: &str = "\
Categoria,Activitat,Preu_Alumne,Num_Alumnes,Cost_Material_Fix,Preu_Hora_Monitor
Esport,Tennis,50,5,20,15
Esport,Padel,\"42,50\",4,\"10,00 €\",\"12,5\"
Tecnologia,Robòtica,\"€35,00\",10,\"1.250,00\",18
";

const REGISTRE_CSV: &str = "\
Data,Activitat,Hores_Fetes,Assistents
05/01/2025,Tennis,2,10
12/01/2025, tennis ,\"1,5\",
03/02/2025,TENNIS,2,
17/02/2025,Padel,3,6
03/03/2025,Tennis,4,14
10/03/2025,Yoga,2,7
sense data,Tennis,9,99
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn workbook() -> SourceSnapshot {
    SourceSnapshot::new(vec![
        read_csv_table("Config", CONFIG_CSV.as_bytes()).unwrap(),
        read_csv_table("Registre", REGISTRE_CSV.as_bytes()).unwrap(),
    ])
}

fn period(s: &str) -> PeriodKey {
    s.parse().unwrap()
}

fn row<'a>(report: &'a ReconciliationReport, id: &str) -> &'a ReconciledActivityPeriod {
    report
        .activities
        .iter()
        .find(|r| r.activity_id == id)
        .unwrap_or_else(|| panic!("missing row {}", id))
}

#[test]
fn test_numeric_parsing_properties() {
    assert_eq!(parse_number(&Cell::from("3,5")), 3.5);
    assert_eq!(parse_number(&Cell::from("3.5")), 3.5);
    assert!((parse_number(&Cell::from("1.234,56")) - 1234.56).abs() < 1e-9);
    assert_eq!(parse_number(&Cell::from("")), 0.0);
    assert_eq!(parse_number(&Cell::Empty), 0.0);
    assert_eq!(parse_number(&Cell::from("€12,00")), 12.0);
}

#[test]
fn test_key_normalization_properties() {
    assert_eq!(normalize_key(" Futbol "), normalize_key("FUTBOL"));
    let key = normalize_key(" Futbol ");
    assert_eq!(normalize_key(&key), key);
}

#[test]
fn test_tennis_end_to_end_scenario() -> anyhow::Result<()> {
    init_logging();

    let snapshot = SourceSnapshot::new(vec![
        RawTable::new(
            "Config",
            vec![
                "Activitat".to_string(),
                "Preu_Alumne".to_string(),
                "Num_Alumnes".to_string(),
                "Cost_Material_Fix".to_string(),
                "Preu_Hora_Monitor".to_string(),
            ],
            vec![vec![
                Cell::from("TENNIS"),
                Cell::Number(50.0),
                Cell::Number(5.0),
                Cell::Number(20.0),
                Cell::Number(15.0),
            ]],
        ),
        RawTable::new(
            "Registre",
            vec![
                "Data".to_string(),
                "Activitat".to_string(),
                "Hores_Fetes".to_string(),
                "Num_Alumnes".to_string(),
            ],
            vec![vec![
                Cell::from("14/03/2025"),
                Cell::from("TENNIS"),
                Cell::Number(4.0),
                Cell::Number(8.0),
            ]],
        ),
    ]);

    let report = reconcile_snapshot(&snapshot, &ReconcileConfig::default(), None)?;
    assert_eq!(report.selected_period, Some(period("2025-03")));

    let tennis = row(&report, "TENNIS");
    assert_eq!(tennis.enrollment_effective, 8.0);
    assert_eq!(tennis.revenue, 400.0);
    assert_eq!(tennis.wage_cost, 60.0);
    assert_eq!(tennis.material_cost, 20.0);
    assert_eq!(tennis.margin, 320.0);
    assert!((tennis.margin_ratio - 0.80).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_forward_fill_across_periods() -> anyhow::Result<()> {
    init_logging();
    let snapshot = workbook();
    let config = ReconcileConfig::default();

    let january = reconcile_snapshot(&snapshot, &config, Some(period("2025-01")))?;
    let tennis = row(&january, "TENNIS");
    // Two January records: explicit 10 and a carried 10; hours summed
    assert_eq!(tennis.enrollment_effective, 10.0);
    assert_eq!(tennis.hours_total, 3.5);
    assert_eq!(tennis.record_count, 2);

    let february = reconcile_snapshot(&snapshot, &config, Some(period("2025-02")))?;
    let tennis = row(&february, "TENNIS");
    assert_eq!(tennis.enrollment_effective, 10.0);
    assert_eq!(tennis.enrollment_origin, EnrollmentOrigin::CarriedForward);

    let march = reconcile_snapshot(&snapshot, &config, Some(period("2025-03")))?;
    assert_eq!(row(&march, "TENNIS").enrollment_effective, 14.0);
    Ok(())
}

#[test]
fn test_locale_values_flow_through_ingestion() -> anyhow::Result<()> {
    let report = reconcile_snapshot(&workbook(), &ReconcileConfig::default(), Some(period("2025-02")))?;

    let padel = row(&report, "PADEL");
    assert_eq!(padel.revenue, 42.5 * 6.0);
    assert_eq!(padel.wage_cost, 3.0 * 12.5);
    assert_eq!(padel.material_cost, 10.0);

    let robotica = row(&report, "ROBÒTICA");
    assert_eq!(robotica.revenue, 350.0);
    assert_eq!(robotica.material_cost, 1250.0);
    assert_eq!(robotica.margin, -900.0);
    assert_eq!(robotica.hours_total, 0.0);
    assert_eq!(robotica.enrollment_origin, EnrollmentOrigin::Baseline);
    Ok(())
}

#[test]
fn test_margin_identity_over_full_history() -> anyhow::Result<()> {
    let snapshot = workbook();
    let config = ReconcileConfig::default();
    let overview = reconcile_snapshot(&snapshot, &config, None)?;

    for p in &overview.available_periods {
        let report = reconcile_snapshot(&snapshot, &config, Some(*p))?;
        for r in &report.activities {
            assert!((r.margin - (r.revenue - r.wage_cost - r.material_cost)).abs() < 1e-9);
            assert!(r.margin_ratio.is_finite());
            assert!(r.unit_margin.is_finite());
        }
    }
    Ok(())
}

#[test]
fn test_unmatched_activity_is_excluded_but_reported() -> anyhow::Result<()> {
    let report = reconcile_snapshot(&workbook(), &ReconcileConfig::default(), Some(period("2025-03")))?;

    assert_eq!(report.activities.len(), 3);
    assert!(report.activities.iter().all(|r| r.activity_id != "YOGA"));
    assert_eq!(report.data_quality.unmatched_records, 1);
    assert_eq!(report.data_quality.unmatched_activities.get("YOGA"), Some(&1));
    assert!(!report.data_quality.is_clean());
    Ok(())
}

#[test]
fn test_unparsable_dates_are_reported_and_excluded() -> anyhow::Result<()> {
    let report = reconcile_snapshot(&workbook(), &ReconcileConfig::default(), None)?;

    let unparsable = &report.data_quality.ingestion.unparsable_dates;
    assert_eq!(unparsable.len(), 1);
    assert_eq!(unparsable[0].raw, "sense data");
    // The undated 99 attendance never shows up anywhere
    assert!(report.activities.iter().all(|r| r.enrollment_effective < 99.0));
    Ok(())
}

#[test]
fn test_treasury_is_independent_of_selection() -> anyhow::Result<()> {
    let snapshot = workbook();
    let config = ReconcileConfig::default();

    let latest = reconcile_snapshot(&snapshot, &config, None)?;
    let oldest = reconcile_snapshot(&snapshot, &config, Some(period("2025-01")))?;
    assert_eq!(latest.treasury, oldest.treasury);
    assert_eq!(latest.history, oldest.history);

    let summed: f64 = latest.history.iter().map(|h| h.totals.margin).sum();
    assert!((latest.treasury - summed).abs() < 1e-9);

    let periods: Vec<String> = latest
        .history
        .iter()
        .map(|h| h.totals.period.unwrap().to_string())
        .collect();
    assert_eq!(periods, vec!["2025-01", "2025-02", "2025-03"]);

    // Category views leave the computation alone
    let esport = latest.filter_by_category("Esport");
    assert_eq!(esport.len(), 2);
    let again = reconcile_snapshot(&snapshot, &config, None)?;
    assert_eq!(again, latest);
    Ok(())
}

#[test]
fn test_category_rollup_and_delta() -> anyhow::Result<()> {
    let report = reconcile_snapshot(&workbook(), &ReconcileConfig::default(), Some(period("2025-03")))?;

    let esport = report
        .categories
        .iter()
        .find(|c| c.category.as_deref() == Some("Esport"))
        .unwrap();
    let tennis = row(&report, "TENNIS");
    let padel = row(&report, "PADEL");
    assert!((esport.revenue - (tennis.revenue + padel.revenue)).abs() < 1e-9);
    assert!((esport.margin_ratio - esport.margin / esport.revenue).abs() < 1e-12);

    let delta = report.delta_vs_previous.as_ref().unwrap();
    assert_eq!(delta.previous, period("2025-02"));
    assert_eq!(delta.current, period("2025-03"));
    let previous = report
        .history
        .iter()
        .find(|h| h.totals.period == Some(period("2025-02")))
        .unwrap();
    assert!((delta.margin - (report.totals.margin - previous.totals.margin)).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_missing_configuration_is_fatal() {
    let snapshot = SourceSnapshot::new(vec![read_csv_table("Registre", REGISTRE_CSV.as_bytes()).unwrap()]);
    let result = reconcile_snapshot(&snapshot, &ReconcileConfig::default(), None);
    assert!(matches!(
        result,
        Err(ReconciliationError::NoConfigurationTable { scanned: 1 })
    ));
}

#[test]
fn test_missing_usage_log_degrades_to_baseline() -> anyhow::Result<()> {
    init_logging();
    let snapshot = SourceSnapshot::new(vec![read_csv_table("Config", CONFIG_CSV.as_bytes())?]);
    let report = reconcile_snapshot(&snapshot, &ReconcileConfig::default(), None)?;

    assert!(report.data_quality.usage_log_missing);
    assert_eq!(report.selected_period, None);
    assert!(report.available_periods.is_empty());
    assert!(report.history.is_empty());
    assert_eq!(report.treasury, 0.0);

    let tennis = row(&report, "TENNIS");
    assert_eq!(tennis.hours_total, 0.0);
    assert_eq!(tennis.wage_cost, 0.0);
    assert_eq!(tennis.enrollment_effective, 5.0);
    Ok(())
}

#[test]
fn test_reordered_and_renamed_sheets() -> anyhow::Result<()> {
    let renamed_config = CONFIG_CSV.replace("Preu_Alumne", " Preu  Alumne ");
    let snapshot = SourceSnapshot::new(vec![
        RawTable::new("Notes", vec!["Comentari".to_string()], Vec::new()),
        read_csv_table("Registre", REGISTRE_CSV.as_bytes())?,
        read_csv_table("Config", renamed_config.as_bytes())?,
    ]);

    let report = reconcile_snapshot(&snapshot, &ReconcileConfig::default(), None)?;
    assert_eq!(report.data_quality.configuration_table.as_deref(), Some("Config"));
    assert_eq!(report.data_quality.usage_log_table.as_deref(), Some("Registre"));
    assert_eq!(row(&report, "TENNIS").revenue, 700.0);
    Ok(())
}

#[test]
fn test_config_from_json_changes_behaviour() -> anyhow::Result<()> {
    let config = ReconcileConfig::from_json_str(
        r#"{ "dates": { "day_first": false }, "columns": { "hours": ["Worked"] } }"#,
    )?;
    let snapshot = SourceSnapshot::from_json_str(
        r#"{ "tables": [
            { "name": "Config", "headers": ["Activity", "Unit Price", "Enrollment"],
              "rows": [["Chess", 30, 4]] },
            { "name": "Log", "headers": ["Date", "Activity", "Worked"],
              "rows": [["04/05/2025", "chess", 2], ["04/06/2025", "chess", null]] }
        ] }"#,
    )?;

    let report = reconcile_snapshot(&snapshot, &config, None)?;
    let periods: Vec<String> = report.available_periods.iter().map(|p| p.to_string()).collect();
    assert_eq!(periods, vec!["2025-04"]);
    let chess = row(&report, "CHESS");
    assert_eq!(chess.hours_total, 2.0);
    assert_eq!(chess.revenue, 120.0);
    Ok(())
}

#[test]
fn test_csv_export_of_report() -> anyhow::Result<()> {
    let report = reconcile_snapshot(&workbook(), &ReconcileConfig::default(), None)?;

    let activities = report.activities_to_csv()?;
    assert_eq!(activities.lines().count(), 1 + report.activities.len());

    let history = report.history_to_csv()?;
    assert!(history.starts_with("period,activity_count,revenue"));
    assert_eq!(history.lines().count(), 4);
    Ok(())
}
