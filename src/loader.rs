use crate::config::ColumnConfig;
use crate::types::{CaseRecord, Dataset, Dimension};
use crate::util::{parse_date_safe, title_case};
use chrono::Datelike;
use tracing::{info, warn};

/// Column positions resolved against a concrete sheet header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub entry_date: Option<usize>,
    pub first_inspection_date: Option<usize>,
    pub conclusion_date: Option<usize>,
    pub classification: Option<usize>,
    pub status: Option<usize>,
    pub territory: Option<usize>,
    pub coordination: Option<usize>,
}

impl ResolvedSchema {
    pub fn has(&self, dim: Dimension) -> bool {
        match dim {
            Dimension::Classification => self.classification.is_some(),
            Dimension::Territory => self.territory.is_some(),
            Dimension::Coordination => self.coordination.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedDataset {
    pub schema: ResolvedSchema,
    pub records: Vec<CaseRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Rows whose entry date is missing or unparseable.
    pub undated_rows: usize,
    pub missing_columns: Vec<String>,
}

fn find_exact(headers: &[String], name: &str) -> Option<usize> {
    let name = name.trim();
    headers.iter().position(|h| h.trim() == name)
}

/// First header, in column order, containing any alias (case-insensitive).
pub fn find_by_alias(headers: &[String], aliases: &[String]) -> Option<usize> {
    let aliases: Vec<String> = aliases.iter().map(|a| a.trim().to_uppercase()).collect();
    headers.iter().position(|h| {
        let h = h.trim().to_uppercase();
        aliases.iter().any(|a| !a.is_empty() && h.contains(a.as_str()))
    })
}

pub fn resolve_schema(headers: &[String], columns: &ColumnConfig) -> ResolvedSchema {
    ResolvedSchema {
        entry_date: find_exact(headers, &columns.entry_date),
        first_inspection_date: find_exact(headers, &columns.first_inspection_date),
        conclusion_date: find_exact(headers, &columns.conclusion_date),
        classification: find_by_alias(headers, &columns.classification_aliases),
        status: find_by_alias(headers, &columns.status_aliases),
        territory: find_by_alias(headers, &columns.territory_aliases),
        coordination: find_by_alias(headers, &columns.coordination_aliases),
    }
}

fn optional_text(row: &[String], idx: Option<usize>) -> Option<String> {
    Dataset::cell(row, idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn normalize_row(source_row: usize, row: &[String], schema: &ResolvedSchema) -> CaseRecord {
    let entry_date = parse_date_safe(Dataset::cell(row, schema.entry_date));
    let first_inspection_date = parse_date_safe(Dataset::cell(row, schema.first_inspection_date));
    let conclusion_date = parse_date_safe(Dataset::cell(row, schema.conclusion_date));

    let classification = Dataset::cell(row, schema.classification).unwrap_or("");
    let status = Dataset::cell(row, schema.status).unwrap_or("");

    CaseRecord {
        source_row,
        entry_date,
        first_inspection_date,
        conclusion_date,
        risk_classification: title_case(classification.trim()),
        status: status.trim().to_uppercase(),
        territory: optional_text(row, schema.territory),
        coordination_unit: optional_text(row, schema.coordination),
        entry_year: entry_date.map(|d| d.year()),
        entry_month: entry_date.map(|d| d.month()),
    }
}

/// Type every row of `data`. Never fails: bad cells become `None`, missing
/// columns leave the corresponding field empty for every row.
pub fn normalize(data: &Dataset, columns: &ColumnConfig) -> (NormalizedDataset, LoadReport) {
    let schema = resolve_schema(&data.headers, columns);

    let mut missing_columns = Vec::new();
    for (idx, name) in [
        (schema.entry_date, &columns.entry_date),
        (schema.first_inspection_date, &columns.first_inspection_date),
        (schema.conclusion_date, &columns.conclusion_date),
    ] {
        if idx.is_none() {
            warn!(column = %name, "required date column not found; its deadline will never be met");
            missing_columns.push(name.clone());
        }
    }

    let records: Vec<CaseRecord> = data
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| normalize_row(i + 1, row, &schema))
        .collect();

    let undated_rows = records.iter().filter(|r| r.entry_date.is_none()).count();
    info!(
        rows = records.len(),
        undated = undated_rows,
        classification = schema.classification.is_some(),
        territory = schema.territory.is_some(),
        coordination = schema.coordination.is_some(),
        "normalized dataset"
    );

    let report = LoadReport {
        total_rows: data.row_count(),
        undated_rows,
        missing_columns,
    };
    (NormalizedDataset { schema, records }, report)
}
