use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

/// Raw tabular data as fetched from the data source.
///
/// Every cell is kept as text; typing happens in the normalizer.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell of `row` at column `idx`, `None` for short rows.
    pub fn cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
        idx.and_then(|i| row.get(i)).map(|s| s.as_str())
    }
}

/// One regulatory case after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    /// 1-based data row in the source (header excluded).
    pub source_row: usize,
    pub entry_date: Option<NaiveDate>,
    pub first_inspection_date: Option<NaiveDate>,
    pub conclusion_date: Option<NaiveDate>,
    pub risk_classification: String,
    pub status: String,
    pub territory: Option<String>,
    pub coordination_unit: Option<String>,
    pub entry_year: Option<i32>,
    pub entry_month: Option<u32>,
}

/// A case record with its deadlines and compliance flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub record: CaseRecord,
    pub first_deadline: Option<NaiveDate>,
    pub second_deadline: Option<NaiveDate>,
    pub met_first_deadline: bool,
    pub met_second_deadline: bool,
}

/// Optional organizational / categorical dimensions a record can be filtered
/// or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Classification,
    Territory,
    Coordination,
}

impl Dimension {
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Classification => "Classification",
            Dimension::Territory => "Territory",
            Dimension::Coordination => "Coordination",
        }
    }

    pub fn value_of<'a>(&self, record: &'a CaseRecord) -> Option<&'a str> {
        match self {
            Dimension::Classification => Some(record.risk_classification.as_str()),
            Dimension::Territory => record.territory.as_deref(),
            Dimension::Coordination => record.coordination_unit.as_deref(),
        }
    }

    /// Value used for selection: a missing territory or coordination is
    /// selected as the blank value, the same way a blank classification is.
    pub fn selection_key<'a>(&self, record: &'a CaseRecord) -> &'a str {
        self.value_of(record).unwrap_or("")
    }
}

/// Compliance counts for one (year, month) bucket, or for the whole filtered
/// set when `year`/`month` are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub entries: usize,
    pub met_first_count: usize,
    pub met_first_pct: f64,
    pub met_second_count: usize,
    pub met_second_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionSummary {
    pub value: String,
    pub entries: usize,
    pub met_first_count: usize,
    pub met_second_count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PeriodSummaryRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Entries")]
    #[tabled(rename = "Entries")]
    pub entries: usize,
    #[serde(rename = "Inspected30")]
    #[tabled(rename = "Inspected30")]
    pub met_first_count: usize,
    #[serde(rename = "Inspected30Pct")]
    #[tabled(rename = "Inspected30Pct")]
    pub met_first_pct: String,
    #[serde(rename = "Concluded90")]
    #[tabled(rename = "Concluded90")]
    pub met_second_count: usize,
    #[serde(rename = "Concluded90Pct")]
    #[tabled(rename = "Concluded90Pct")]
    pub met_second_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CaseRow {
    #[serde(rename = "Row")]
    #[tabled(rename = "Row")]
    pub source_row: usize,
    #[serde(rename = "EntryDate")]
    #[tabled(rename = "EntryDate")]
    pub entry_date: String,
    #[serde(rename = "FirstInspection")]
    #[tabled(rename = "FirstInspection")]
    pub first_inspection_date: String,
    #[serde(rename = "Conclusion")]
    #[tabled(rename = "Conclusion")]
    pub conclusion_date: String,
    #[serde(rename = "Classification")]
    #[tabled(rename = "Classification")]
    pub risk_classification: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Territory")]
    #[tabled(rename = "Territory")]
    pub territory: String,
    #[serde(rename = "Coordination")]
    #[tabled(rename = "Coordination")]
    pub coordination_unit: String,
    #[serde(rename = "Deadline30")]
    #[tabled(rename = "Deadline30")]
    pub first_deadline: String,
    #[serde(rename = "Deadline90")]
    #[tabled(rename = "Deadline90")]
    pub second_deadline: String,
    #[serde(rename = "Inspected30")]
    #[tabled(rename = "Inspected30")]
    pub met_first_deadline: bool,
    #[serde(rename = "Concluded90")]
    #[tabled(rename = "Concluded90")]
    pub met_second_deadline: bool,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DimensionRow {
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Entries")]
    #[tabled(rename = "Entries")]
    pub entries: usize,
    #[serde(rename = "Inspected30")]
    #[tabled(rename = "Inspected30")]
    pub met_first_count: usize,
    #[serde(rename = "Concluded90")]
    #[tabled(rename = "Concluded90")]
    pub met_second_count: usize,
}

/// A row type that can be exported as a sheet.
pub trait SheetRow: Tabled {
    /// Headers whose cells are written as numbers; every other cell stays text.
    const NUMERIC_COLUMNS: &'static [&'static str];
}

impl SheetRow for PeriodSummaryRow {
    const NUMERIC_COLUMNS: &'static [&'static str] = &[
        "Entries",
        "Inspected30",
        "Inspected30Pct",
        "Concluded90",
        "Concluded90Pct",
    ];
}

impl SheetRow for CaseRow {
    const NUMERIC_COLUMNS: &'static [&'static str] = &["Row"];
}

impl SheetRow for DimensionRow {
    const NUMERIC_COLUMNS: &'static [&'static str] = &["Entries", "Inspected30", "Concluded90"];
}

/// Tabular payload for one exported sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Per column: write cells as numbers.
    pub numeric: Vec<bool>,
}

impl SheetData {
    pub fn from_rows<T: SheetRow>(rows: &[T]) -> Self {
        let headers: Vec<String> = T::headers().into_iter().map(|h| h.into_owned()).collect();
        let numeric = headers
            .iter()
            .map(|h| T::NUMERIC_COLUMNS.contains(&h.as_str()))
            .collect();
        Self {
            headers,
            rows: rows
                .iter()
                .map(|r| r.fields().into_iter().map(|f| f.into_owned()).collect())
                .collect(),
            numeric,
        }
    }

    pub fn is_numeric(&self, col: usize) -> bool {
        self.numeric.get(col).copied().unwrap_or(false)
    }
}

/// Headline numbers written as JSON next to the exported workbook.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub entries: usize,
    pub met_first_count: usize,
    pub met_first_pct: f64,
    pub met_second_count: usize,
    pub met_second_pct: f64,
    pub late_first_count: usize,
    pub late_second_count: usize,
}
