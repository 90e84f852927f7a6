use crate::error::{IndicatorError, Result};
use crate::types::SheetData;
use indexmap::IndexMap;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

/// Sheet names longer than this are rejected by spreadsheet applications.
pub const MAX_SHEET_NAME_LEN: usize = 31;

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path.as_ref(), s).map_err(|e| IndicatorError::Io {
        path: path.as_ref().to_path_buf(),
        source: e,
    })?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if rows.len() > max_rows {
        println!("... {} more rows\n", rows.len() - max_rows);
    }
}

pub fn truncate_sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME_LEN).collect()
}

fn write_sheet(worksheet: &mut Worksheet, data: &SheetData) -> Result<()> {
    for (col, header) in data.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }
    for (i, row) in data.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let number = data
                .is_numeric(col)
                .then(|| cell.parse::<f64>().ok())
                .flatten()
                .filter(|n| n.is_finite());
            let col = col as u16;
            match number {
                Some(n) => worksheet.write_number(r, col, n)?,
                None => worksheet.write_string(r, col, cell)?,
            };
        }
    }
    Ok(())
}

/// First `Sheet<N>` (from `start`) not yet in `used`; the name is claimed.
fn generic_sheet_name(used: &mut HashSet<String>, start: usize) -> String {
    let mut n = start;
    loop {
        let name = format!("Sheet{}", n);
        if used.insert(name.to_lowercase()) {
            return name;
        }
        n += 1;
    }
}

/// Build the workbook: one sheet per entry, names cut to 31 characters.
/// A sheet whose name cannot be used gets the first free `Sheet<N>` name.
pub fn build_workbook(sheets: &IndexMap<String, SheetData>) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let mut used: HashSet<String> = HashSet::new();

    for (idx, (name, data)) in sheets.iter().enumerate() {
        let mut worksheet = Worksheet::new();
        let wanted = truncate_sheet_name(name.trim());
        let named = !used.contains(&wanted.to_lowercase()) && worksheet.set_name(&wanted).is_ok();
        if named {
            used.insert(wanted.to_lowercase());
        } else {
            let fallback = generic_sheet_name(&mut used, idx + 1);
            warn!(sheet = %name, %fallback, "sheet name rejected; using generic name");
            worksheet.set_name(&fallback)?;
        }
        write_sheet(&mut worksheet, data)?;
        workbook.push_worksheet(worksheet);
    }
    Ok(workbook)
}

/// The exported workbook as bytes, ready to hand out as a download.
pub fn workbook_bytes(sheets: &IndexMap<String, SheetData>) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(sheets)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn export_workbook(path: impl AsRef<Path>, sheets: &IndexMap<String, SheetData>) -> Result<()> {
    let path = path.as_ref();
    let bytes = workbook_bytes(sheets)?;
    std::fs::write(path, bytes).map_err(|e| IndicatorError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), sheets = sheets.len(), "exported workbook");
    Ok(())
}
