//! Fetching the raw case sheet.
//!
//! Sources are a local CSV, a local spreadsheet (first sheet) or a remote CSV
//! export. Any failure here is fatal for the current pass.

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{IndicatorError, Result};
use crate::types::Dataset;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    LocalCsv(PathBuf),
    LocalSpreadsheet(PathBuf),
    /// URL answering with CSV text.
    Remote(String),
}

impl DataSource {
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(IndicatorError::InvalidSource("empty source".to_string()));
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return Ok(DataSource::Remote(csv_export_url(location)?));
        }
        let path = PathBuf::from(location);
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            Ok(DataSource::LocalSpreadsheet(path))
        } else {
            Ok(DataSource::LocalCsv(path))
        }
    }
}

/// Rewrite a Google Sheets link (`.../d/<id>/edit...`) into its CSV export
/// URL. Other URLs are returned unchanged.
pub fn csv_export_url(url: &str) -> Result<String> {
    if !url.contains("docs.google.com/spreadsheets") {
        return Ok(url.to_string());
    }
    let id = url
        .split("/d/")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            IndicatorError::InvalidSource(format!("no sheet id in Google Sheets URL: {}", url))
        })?;
    Ok(format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
        id
    ))
}

pub fn fetch(source: &DataSource) -> Result<Dataset> {
    let data = match source {
        DataSource::LocalCsv(path) => {
            let bytes = std::fs::read(path).map_err(|e| IndicatorError::Io {
                path: path.clone(),
                source: e,
            })?;
            parse_csv(&bytes)?
        }
        DataSource::LocalSpreadsheet(path) => read_spreadsheet(path)?,
        DataSource::Remote(url) => {
            debug!(%url, "fetching remote sheet");
            let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
            parse_csv(&bytes)?
        }
    };
    info!(
        rows = data.row_count(),
        columns = data.headers.len(),
        "fetched dataset"
    );
    Ok(data)
}

pub fn parse_csv(bytes: &[u8]) -> Result<Dataset> {
    // Spreadsheet exports often carry a UTF-8 BOM.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(Dataset::new(headers, rows))
}

fn read_spreadsheet(path: &Path) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IndicatorError::Spreadsheet(format!("{}: {}", path.display(), e)))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IndicatorError::Spreadsheet(format!("{}: no sheets", path.display())))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| IndicatorError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = rows
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();
    Ok(Dataset::new(headers, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        // Day-first so the normalizer reads it like any typed-in date.
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Keeps the last fetched dataset for `ttl` before hitting the source again.
#[derive(Debug)]
pub struct CachedSource {
    source: DataSource,
    ttl: Duration,
    cached: Option<(Instant, Dataset)>,
}

impl CachedSource {
    pub fn new(source: DataSource, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|(at, _)| at.elapsed() < self.ttl)
    }

    pub fn get(&mut self) -> Result<&Dataset> {
        if !self.is_fresh() {
            let data = fetch(&self.source)?;
            self.cached = Some((Instant::now(), data));
        } else {
            debug!("using cached dataset");
        }
        match &self.cached {
            Some((_, data)) => Ok(data),
            None => Err(IndicatorError::InvalidSource("dataset not loaded".to_string())),
        }
    }
}
