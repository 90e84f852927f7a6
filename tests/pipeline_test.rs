//! End-to-end tests: sheet on disk → indicators → exported workbook.

use calamine::{open_workbook_auto, Data, Reader};
use std::collections::BTreeSet;
use std::io::Write;
use tempfile::NamedTempFile;

use visa_indicators::filters::observed_values;
use visa_indicators::output::export_workbook;
use visa_indicators::reports::report_sheets;
use visa_indicators::source::{fetch, DataSource};
use visa_indicators::{
    build_report, normalize, ColumnConfig, Dimension, FilterCriteria, PeriodSelector,
    PrivilegeLevel, Session,
};

fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

const SHEET: &str = "\
ENTRADA ,1ª INSPEÇÃO,DATA CONCLUSÃO,CLASSIFICAÇÃO,SITUAÇÃO,TERRITÓRIO,COORDENAÇÃO
01/01/2024,31/01/2024,30/03/2024,alto risco,concluído,T1,Alimentos
01/01/2024,01/02/2024,,ALTO RISCO,em análise,T2,Alimentos
15/02/2024,20/02/2024,01/06/2024,baixo risco,concluído,T1,Serviços
20/02/2024,,,baixo risco,aberto,T2,Serviços
,10/01/2024,10/01/2024,alto risco,aberto,T1,Alimentos
03/03/2023,04/03/2023,05/03/2023,baixo risco,concluído,T1,Serviços
";

fn load() -> visa_indicators::NormalizedDataset {
    let file = create_test_file(SHEET);
    let source = DataSource::parse(file.path().to_str().unwrap()).unwrap();
    let data = fetch(&source).expect("fetch failed");
    let (dataset, report) = normalize(&data, &ColumnConfig::default());
    assert_eq!(report.total_rows, 6);
    assert_eq!(report.undated_rows, 1);
    dataset
}

fn year_2024(dataset: &visa_indicators::NormalizedDataset, privilege: PrivilegeLevel) -> FilterCriteria {
    let period = PeriodSelector::YearMonths {
        year: 2024,
        months: (1..=12).collect(),
    };
    FilterCriteria::with_full_domain(dataset, period, privilege)
}

#[test]
fn test_csv_to_indicators() {
    let dataset = load();
    assert_eq!(
        observed_values(&dataset.records, Dimension::Classification),
        BTreeSet::from(["Alto Risco".to_string(), "Baixo Risco".to_string()])
    );

    let session = Session::new("viewer", PrivilegeLevel::Standard);
    let report = build_report(&dataset, &year_2024(&dataset, session.privilege), &session);

    assert_eq!(report.totals.entries, 4);
    assert_eq!(report.totals.met_first_count, 2);
    assert_eq!(report.totals.met_first_pct, 50.0);
    assert_eq!(report.totals.met_second_count, 1);
    assert_eq!(report.totals.met_second_pct, 25.0);

    let periods: Vec<_> = report.by_period.iter().map(|s| (s.year, s.month)).collect();
    assert_eq!(periods, vec![(Some(2024), Some(2)), (Some(2024), Some(1))]);
    assert_eq!(report.by_period[1].met_first_pct, 50.0);
    assert!(report.detail.is_none());
}

#[test]
fn test_classification_and_territory_filters() {
    let dataset = load();
    let session = Session::new("admin", PrivilegeLevel::Elevated);
    let mut criteria = year_2024(&dataset, session.privilege);
    criteria.classifications = Some(BTreeSet::from(["Baixo Risco".to_string()]));
    criteria.territories = Some(BTreeSet::from(["T2".to_string()]));

    let report = build_report(&dataset, &criteria, &session);
    assert_eq!(report.totals.entries, 1);
    let detail = report.detail.expect("elevated view has detail");
    assert_eq!(detail.classified[0].record.source_row, 4);
    assert_eq!(detail.late_first.len(), 1);
    assert_eq!(detail.late_second.len(), 1);
}

#[test]
fn test_date_range_excludes_undated() {
    let dataset = load();
    let session = Session::new("admin", PrivilegeLevel::Elevated);
    let period = PeriodSelector::DateRange {
        start: chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        end: chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
    };
    let criteria = FilterCriteria::with_full_domain(&dataset, period, session.privilege);
    let report = build_report(&dataset, &criteria, &session);
    assert_eq!(report.totals.entries, 5);
    let detail = report.detail.unwrap();
    assert!(detail.classified.iter().all(|c| c.record.entry_date.is_some()));
    let coord = detail.by_coordination.unwrap();
    assert_eq!(coord.len(), 2);
    assert_eq!(coord[0].value, "Alimentos");
    assert_eq!(coord[0].entries, 2);
}

#[test]
fn test_export_workbook_round_trip() {
    let dataset = load();
    let session = Session::new("admin", PrivilegeLevel::Elevated);
    let report = build_report(&dataset, &year_2024(&dataset, session.privilege), &session);
    let mut sheets = report_sheets(&report);
    let by_period = sheets["By period"].clone();
    sheets.insert(
        "Monthly compliance indicators by inspection team".to_string(),
        by_period,
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("indicadores.xlsx");
    export_workbook(&path, &sheets).expect("export failed");

    let mut workbook = open_workbook_auto(&path).expect("workbook readable");
    let names = workbook.sheet_names().to_vec();
    assert_eq!(names.len(), sheets.len());
    assert!(names.iter().all(|n| n.chars().count() <= 31));
    assert!(names.contains(&"Late first inspection (30 days)".to_string()));
    assert!(names.contains(&"Monthly compliance indicators b".to_string()));

    let cases = workbook.worksheet_range("Cases").unwrap();
    // Header plus the four 2024 cases.
    assert_eq!(cases.height(), 5);
}

const CODED_SHEET: &str = "\
ENTRADA,1ª INSPEÇÃO,CLASSIFICAÇÃO,TERRITÓRIO,COORDENAÇÃO
02/01/2024,05/01/2024,1e3,007,Alimentos
03/01/2024,,alto risco,,
";

fn load_coded() -> visa_indicators::NormalizedDataset {
    let file = create_test_file(CODED_SHEET);
    let data = fetch(&DataSource::parse(file.path().to_str().unwrap()).unwrap()).unwrap();
    normalize(&data, &ColumnConfig::default()).0
}

#[test]
fn test_blank_territory_and_coordination_keep_totals_equal() {
    let dataset = load_coded();
    let admin = Session::new("admin", PrivilegeLevel::Elevated);
    let viewer = Session::new("viewer", PrivilegeLevel::Standard);

    let full = build_report(&dataset, &year_2024(&dataset, admin.privilege), &admin);
    let plain = build_report(&dataset, &year_2024(&dataset, viewer.privilege), &viewer);
    assert_eq!(full.totals.entries, 2);
    assert_eq!(full.totals, plain.totals);
    assert_eq!(full.by_period, plain.by_period);
}

#[test]
fn test_export_keeps_codes_as_text() {
    let dataset = load_coded();
    let session = Session::new("admin", PrivilegeLevel::Elevated);
    let report = build_report(&dataset, &year_2024(&dataset, session.privilege), &session);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codes.xlsx");
    export_workbook(&path, &report_sheets(&report)).expect("export failed");

    let mut workbook = open_workbook_auto(&path).expect("workbook readable");
    let cases = workbook.worksheet_range("Cases").unwrap();
    let rows: Vec<Vec<Data>> = cases.rows().map(|r| r.to_vec()).collect();
    let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
    let col = |name: &str| header.iter().position(|h| h == name).unwrap();

    assert_eq!(rows[1][col("Row")], Data::Float(1.0));
    assert_eq!(rows[1][col("Territory")], Data::String("007".to_string()));
    assert_eq!(rows[1][col("Classification")], Data::String("1E3".to_string()));

    let indicators = workbook.worksheet_range("Indicators").unwrap();
    let totals: Vec<Data> = indicators.rows().nth(1).unwrap().to_vec();
    assert_eq!(totals[1], Data::Float(2.0));
}

#[test]
fn test_missing_file_is_an_error() {
    let source = DataSource::parse("/no/such/dir/casos.csv").unwrap();
    assert!(fetch(&source).is_err());
}
