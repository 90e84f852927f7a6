//! Error types for loading, exporting and configuring the indicator panel.
//!
//! The indicator computation itself never fails; everything here belongs to
//! the collaborators around it (data source, export, configuration).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote data source could not be reached or answered with an error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A local spreadsheet could not be opened or has no readable sheet.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Workbook export error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid data source: {0}")]
    InvalidSource(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
