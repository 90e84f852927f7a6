// Entry point and interactive CLI flow.
//
// - The viewer logs in first; the resulting `Session` decides which sections
//   are shown and whether export is available.
// - Option [1] fetches and normalizes the case sheet, printing diagnostics.
// - Options [2] and [3] narrow the period and the categorical filters.
// - Option [4] computes and prints the indicators; [5] exports them.
use chrono::NaiveDate;
use clap::Parser;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use visa_indicators::auth::{login, Authenticator, Session, StaticCredentials};
use visa_indicators::config::{AppConfig, ColumnConfig};
use visa_indicators::filters::{
    entry_date_bounds, observed_months, observed_values, observed_years, parse_selection,
    FilterCriteria, PeriodSelector,
};
use visa_indicators::loader::{normalize, NormalizedDataset};
use visa_indicators::output;
use visa_indicators::reports::{
    build_report, case_rows, dimension_rows, generate_summary, report_sheets, summary_rows,
    IndicatorReport,
};
use visa_indicators::source::{CachedSource, DataSource};
use visa_indicators::types::Dimension;
use visa_indicators::util::{format_int, format_number, parse_date_safe, parse_i32_safe};

/// Sanitary-inspection compliance panel
#[derive(Parser)]
#[command(name = "visa-indicators")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (users, source, column names)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the data source (CSV/spreadsheet path or http(s) URL)
    #[arg(short, long)]
    source: Option<String>,

    /// Override the workbook export path
    #[arg(short, long, value_name = "FILE")]
    export: Option<PathBuf>,
}

struct AppState {
    cache: CachedSource,
    columns: ColumnConfig,
    export_path: PathBuf,
    dataset: Option<NormalizedDataset>,
    criteria: Option<FilterCriteria>,
}

enum SessionEnd {
    Logout,
    Exit,
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    prompt("Enter choice: ")
}

fn prompt_login(auth: &dyn Authenticator) -> Option<Session> {
    loop {
        println!("Sign in to the inspection panel (blank username to quit)");
        let username = prompt("Username: ");
        if username.is_empty() {
            return None;
        }
        let password = prompt("Password: ");
        match login(auth, &username, &password) {
            Some(session) => {
                info!(user = %session.username, privilege = ?session.privilege, "login");
                println!("Welcome, {}.\n", session.username);
                return Some(session);
            }
            None => {
                warn!(user = %username, "rejected login");
                println!("Invalid username or password.\n");
            }
        }
    }
}

/// Comma-separated list of 1-based indexes into `options`; blank keeps all.
/// Asks again until the input names at least one listed option.
fn prompt_selection(label: &str, options: &BTreeSet<String>) -> BTreeSet<String> {
    println!("{}:", label);
    for (i, o) in options.iter().enumerate() {
        let shown = if o.is_empty() { "(blank)" } else { o.as_str() };
        println!("  [{}] {}", i + 1, shown);
    }
    loop {
        let input = prompt("Select (comma separated, blank = all): ");
        match parse_selection(&input, options) {
            Some(selected) => return selected,
            None => {
                warn!(input = %input, "invalid selection");
                println!("Please enter numbers between 1 and {}.\n", options.len());
            }
        }
    }
}

fn default_period(dataset: &NormalizedDataset) -> PeriodSelector {
    match entry_date_bounds(&dataset.records) {
        Some((start, end)) => PeriodSelector::DateRange { start, end },
        None => PeriodSelector::DateRange {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        },
    }
}

/// Handle option [1]: fetch (or reuse) the sheet and normalize it.
fn handle_load(state: &mut AppState, session: &Session) {
    let data = match state.cache.get() {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "data source unavailable");
            eprintln!("Failed to load the data source: {}\n", e);
            return;
        }
    };
    let (dataset, report) = normalize(data, &state.columns);
    println!(
        "Processing dataset... ({} rows loaded, {} without a valid entry date)",
        format_int(report.total_rows),
        format_int(report.undated_rows)
    );
    for col in &report.missing_columns {
        println!("Note: column '{}' not found; its deadline is never met.", col);
    }
    println!("");
    let period = default_period(&dataset);
    state.criteria = Some(FilterCriteria::with_full_domain(
        &dataset,
        period,
        session.privilege,
    ));
    state.dataset = Some(dataset);
}

/// Handle option [2]: pick year/months or a date range.
fn handle_period(state: &mut AppState) {
    let (Some(dataset), Some(criteria)) = (&state.dataset, &mut state.criteria) else {
        println!("Error: No data loaded. Please load the data source first (option 1).\n");
        return;
    };
    println!("Period by:");
    println!("[1] Year/Month");
    println!("[2] Date range");
    match read_choice().as_str() {
        "1" => {
            let years = observed_years(&dataset.records);
            if years.is_empty() {
                println!("No dated records to choose from.\n");
                return;
            }
            let listed: Vec<String> = years.iter().map(|y| y.to_string()).collect();
            println!("Years: {}", listed.join(", "));
            let input = prompt("Year: ");
            let Some(year) = parse_i32_safe(Some(input.as_str())).filter(|y| years.contains(y))
            else {
                println!("Invalid year.\n");
                return;
            };
            let available = observed_months(&dataset.records, year);
            let listed: Vec<String> = available.iter().map(|m| m.to_string()).collect();
            println!("Months: {}", listed.join(", "));
            let input = prompt("Months (comma separated, blank = all): ");
            let months: BTreeSet<u32> = if input.is_empty() {
                available
            } else {
                input
                    .split(',')
                    .filter_map(|s| s.trim().parse::<u32>().ok())
                    .filter(|m| (1..=12).contains(m))
                    .collect()
            };
            criteria.period = PeriodSelector::YearMonths { year, months };
        }
        "2" => {
            let PeriodSelector::DateRange { start, end } = default_period(dataset) else {
                return;
            };
            let read = |label: &str, fallback: NaiveDate| {
                let input = prompt(&format!(
                    "{} (dd/mm/yyyy, blank = {}): ",
                    label,
                    fallback.format("%d/%m/%Y")
                ));
                if input.is_empty() {
                    Some(fallback)
                } else {
                    parse_date_safe(Some(input.as_str()))
                }
            };
            match (read("Start date", start), read("End date", end)) {
                (Some(start), Some(end)) => {
                    criteria.period = PeriodSelector::DateRange { start, end };
                }
                _ => {
                    println!("Invalid date.\n");
                    return;
                }
            }
        }
        _ => {
            println!("Invalid choice. Please enter 1 or 2.\n");
            return;
        }
    }
    println!("Period updated.\n");
}

/// Handle option [3]: classification, plus territory and coordination for
/// elevated viewers.
fn handle_filters(state: &mut AppState, session: &Session) {
    let (Some(dataset), Some(criteria)) = (&state.dataset, &mut state.criteria) else {
        println!("Error: No data loaded. Please load the data source first (option 1).\n");
        return;
    };
    let mut dims = vec![Dimension::Classification];
    if session.is_elevated() {
        dims.extend([Dimension::Territory, Dimension::Coordination]);
    }
    for dim in dims {
        if !dataset.schema.has(dim) {
            continue;
        }
        let options = observed_values(&dataset.records, dim);
        let selected = prompt_selection(dim.label(), &options);
        criteria.set_selector(dim, Some(selected));
    }
    println!("Filters updated.\n");
}

fn print_report(report: &IndicatorReport) {
    let t = &report.totals;
    println!("Indicators for the period");
    println!("  Entries: {}", format_int(t.entries));
    println!(
        "  First inspection within 30 days: {}%",
        format_number(t.met_first_pct, 2)
    );
    println!(
        "  Case concluded within 90 days: {}%\n",
        format_number(t.met_second_pct, 2)
    );
    println!("By month (most recent first)\n");
    output::preview_table_rows(&summary_rows(&report.by_period), 12);

    let Some(detail) = &report.detail else {
        println!("You are using the standard view.\n");
        return;
    };
    println!("Cases\n");
    output::preview_table_rows(&case_rows(&detail.classified), 10);
    if let Some(rows) = &detail.by_coordination {
        println!("Inspections by coordination (30/90 days)\n");
        output::preview_table_rows(&dimension_rows(rows), 20);
    }
    if let Some(rows) = &detail.by_territory {
        println!("Inspections by territory (30/90 days)\n");
        output::preview_table_rows(&dimension_rows(rows), 20);
    }
    println!("Late first inspection\n");
    output::preview_table_rows(&case_rows(&detail.late_first), 10);
    println!("Late conclusion\n");
    output::preview_table_rows(&case_rows(&detail.late_second), 10);
}

fn current_report(state: &AppState, session: &Session) -> Option<IndicatorReport> {
    match (&state.dataset, &state.criteria) {
        (Some(dataset), Some(criteria)) => Some(build_report(dataset, criteria, session)),
        _ => {
            println!("Error: No data loaded. Please load the data source first (option 1).\n");
            None
        }
    }
}

/// Handle option [5]: workbook plus a JSON summary next to it.
fn handle_export(state: &AppState, session: &Session) {
    if !session.is_elevated() {
        println!("Export is not available in the standard view.\n");
        return;
    }
    let Some(report) = current_report(state, session) else {
        return;
    };
    let sheets = report_sheets(&report);
    if let Err(e) = output::export_workbook(&state.export_path, &sheets) {
        error!(error = %e, "workbook export failed");
        eprintln!("Write error: {}", e);
        return;
    }
    let summary_path = state.export_path.with_extension("json");
    if let Err(e) = output::write_json(&summary_path, &generate_summary(&report)) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Exported {} sheets to {} (summary in {})\n",
        sheets.len(),
        state.export_path.display(),
        summary_path.display()
    );
}

fn run_session(state: &mut AppState, session: &Session) -> SessionEnd {
    loop {
        println!("Logged in as {} ({:?})", session.username, session.privilege);
        println!("[1] Load the data source");
        println!("[2] Choose period");
        println!("[3] Choose filters");
        println!("[4] Show indicators");
        if session.is_elevated() {
            println!("[5] Export workbook");
        }
        println!("[6] Log out");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(state, session),
            "2" => handle_period(state),
            "3" => handle_filters(state, session),
            "4" => {
                println!("");
                if let Some(report) = current_report(state, session) {
                    print_report(&report);
                }
            }
            "5" if session.is_elevated() => handle_export(state, session),
            "6" => return SessionEnd::Logout,
            "0" => return SessionEnd::Exit,
            _ => println!("Invalid choice.\n"),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => match AppConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read configuration: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    if let Some(source) = cli.source {
        config.source = source;
    }
    if let Some(export) = cli.export {
        config.export_path = export.to_string_lossy().into_owned();
    }

    let credentials = StaticCredentials::new(&config.users);
    if credentials.is_empty() {
        eprintln!("No users configured; add a \"users\" list to the configuration file.");
        return ExitCode::FAILURE;
    }
    let source = match DataSource::parse(&config.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut state = AppState {
        cache: CachedSource::new(source, Duration::from_secs(config.cache_ttl_secs)),
        columns: config.columns,
        export_path: PathBuf::from(config.export_path),
        dataset: None,
        criteria: None,
    };

    while let Some(session) = prompt_login(&credentials) {
        match run_session(&mut state, &session) {
            SessionEnd::Logout => {
                // Selections belong to the viewer that made them.
                state.criteria = None;
                state.dataset = None;
                println!("Logged out.\n");
            }
            SessionEnd::Exit => break,
        }
    }
    println!("Exiting the program.");
    ExitCode::SUCCESS
}
