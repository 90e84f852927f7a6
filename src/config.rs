//! Runtime configuration, read from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::auth::PrivilegeLevel;
use crate::error::{IndicatorError, Result};

/// Column names for the three date columns (exact, after trimming) and alias
/// fragments for the optional dimensions (case-insensitive substring match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub entry_date: String,
    pub first_inspection_date: String,
    pub conclusion_date: String,
    pub classification_aliases: Vec<String>,
    pub status_aliases: Vec<String>,
    pub territory_aliases: Vec<String>,
    pub coordination_aliases: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            entry_date: "ENTRADA".to_string(),
            first_inspection_date: "1ª INSPEÇÃO".to_string(),
            conclusion_date: "DATA CONCLUSÃO".to_string(),
            classification_aliases: vec!["CLASSIFICA".to_string()],
            status_aliases: vec!["SITUA".to_string(), "STATUS".to_string()],
            territory_aliases: vec!["TERR".to_string()],
            coordination_aliases: vec!["COORD".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
    pub privilege: PrivilegeLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Local path (CSV or spreadsheet) or http(s) URL of the case sheet.
    pub source: String,
    /// How long a fetched dataset is reused before it is fetched again.
    pub cache_ttl_secs: u64,
    /// Workbook written by the export action.
    pub export_path: String,
    pub columns: ColumnConfig,
    pub users: Vec<UserEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: "casos.csv".to_string(),
            cache_ttl_secs: 600,
            export_path: "indicadores.xlsx".to_string(),
            columns: ColumnConfig::default(),
            users: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| IndicatorError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.validate()?;
        debug!(path = %path.display(), users = config.users.len(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(IndicatorError::Config("source must not be empty".to_string()));
        }
        let names = [
            &self.columns.entry_date,
            &self.columns.first_inspection_date,
            &self.columns.conclusion_date,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(IndicatorError::Config(
                "date column names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
