use crate::auth::Session;
use crate::deadlines::classify;
use crate::filters::{apply_filters, FilterCriteria};
use crate::loader::NormalizedDataset;
use crate::types::{
    CaseRow, ClassifiedRecord, Dimension, DimensionRow, DimensionSummary, PeriodSummary,
    PeriodSummaryRow, SheetData, SummaryStats,
};
use crate::util::{format_date, format_number, percentage};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One summary over the whole input.
    Total,
    /// One summary per (year, month); undated records are left out.
    ByPeriod(PeriodOrder),
}

#[derive(Default)]
struct Acc {
    entries: usize,
    met_first: usize,
    met_second: usize,
}

impl Acc {
    fn push(&mut self, r: &ClassifiedRecord) {
        self.entries += 1;
        self.met_first += usize::from(r.met_first_deadline);
        self.met_second += usize::from(r.met_second_deadline);
    }

    fn summary(&self, year: Option<i32>, month: Option<u32>) -> PeriodSummary {
        PeriodSummary {
            year,
            month,
            entries: self.entries,
            met_first_count: self.met_first,
            met_first_pct: percentage(self.met_first, self.entries),
            met_second_count: self.met_second,
            met_second_pct: percentage(self.met_second, self.entries),
        }
    }
}

pub fn aggregate(data: &[ClassifiedRecord], grouping: Grouping) -> Vec<PeriodSummary> {
    let order = match grouping {
        Grouping::Total => {
            let mut acc = Acc::default();
            data.iter().for_each(|r| acc.push(r));
            return vec![acc.summary(None, None)];
        }
        Grouping::ByPeriod(order) => order,
    };

    let mut map: HashMap<(i32, u32), Acc> = HashMap::new();
    for r in data {
        let (Some(year), Some(month)) = (r.record.entry_year, r.record.entry_month) else {
            continue;
        };
        map.entry((year, month)).or_default().push(r);
    }
    let mut groups: Vec<((i32, u32), Acc)> = map.into_iter().collect();
    groups.sort_by(|a, b| match order {
        PeriodOrder::Ascending => a.0.cmp(&b.0),
        PeriodOrder::Descending => b.0.cmp(&a.0),
    });
    groups
        .into_iter()
        .map(|((y, m), acc)| acc.summary(Some(y), Some(m)))
        .collect()
}

/// Split into (missed first deadline, missed second deadline), both in input
/// order. A record can land in both, either or neither.
pub fn partition_late(data: &[ClassifiedRecord]) -> (Vec<ClassifiedRecord>, Vec<ClassifiedRecord>) {
    let missed_first = data.iter().filter(|r| !r.met_first_deadline).cloned().collect();
    let missed_second = data.iter().filter(|r| !r.met_second_deadline).cloned().collect();
    (missed_first, missed_second)
}

/// Met-deadline counts per value of `dim`, ordered by value. Records without
/// a value for the dimension are skipped.
pub fn breakdown(data: &[ClassifiedRecord], dim: Dimension) -> Vec<DimensionSummary> {
    let mut map: BTreeMap<String, Acc> = BTreeMap::new();
    for r in data {
        if let Some(value) = dim.value_of(&r.record) {
            map.entry(value.to_string()).or_default().push(r);
        }
    }
    map.into_iter()
        .map(|(value, acc)| DimensionSummary {
            value,
            entries: acc.entries,
            met_first_count: acc.met_first,
            met_second_count: acc.met_second,
        })
        .collect()
}

/// Sections only elevated viewers get to see.
#[derive(Debug, Clone)]
pub struct DetailSections {
    pub classified: Vec<ClassifiedRecord>,
    pub late_first: Vec<ClassifiedRecord>,
    pub late_second: Vec<ClassifiedRecord>,
    pub by_territory: Option<Vec<DimensionSummary>>,
    pub by_coordination: Option<Vec<DimensionSummary>>,
}

#[derive(Debug, Clone)]
pub struct IndicatorReport {
    pub totals: PeriodSummary,
    /// Most recent period first.
    pub by_period: Vec<PeriodSummary>,
    pub detail: Option<DetailSections>,
}

/// One full pass: filter, classify, then aggregate and partition.
pub fn build_report(
    dataset: &NormalizedDataset,
    criteria: &FilterCriteria,
    session: &Session,
) -> IndicatorReport {
    let classified = classify(apply_filters(&dataset.records, criteria));
    let totals = aggregate(&classified, Grouping::Total)
        .into_iter()
        .next()
        .unwrap_or_else(|| Acc::default().summary(None, None));
    let by_period = aggregate(&classified, Grouping::ByPeriod(PeriodOrder::Descending));

    let detail = session.is_elevated().then(|| {
        let (late_first, late_second) = partition_late(&classified);
        let by_dim = |dim| dataset.schema.has(dim).then(|| breakdown(&classified, dim));
        DetailSections {
            by_territory: by_dim(Dimension::Territory),
            by_coordination: by_dim(Dimension::Coordination),
            late_first,
            late_second,
            classified,
        }
    });

    IndicatorReport {
        totals,
        by_period,
        detail,
    }
}

pub fn period_label(s: &PeriodSummary) -> String {
    match (s.year, s.month) {
        (Some(y), Some(m)) => format!("{:04}-{:02}", y, m),
        _ => "Total".to_string(),
    }
}

pub fn summary_rows(summaries: &[PeriodSummary]) -> Vec<PeriodSummaryRow> {
    summaries
        .iter()
        .map(|s| PeriodSummaryRow {
            period: period_label(s),
            entries: s.entries,
            met_first_count: s.met_first_count,
            met_first_pct: format_number(s.met_first_pct, 2),
            met_second_count: s.met_second_count,
            met_second_pct: format_number(s.met_second_pct, 2),
        })
        .collect()
}

pub fn case_rows(data: &[ClassifiedRecord]) -> Vec<CaseRow> {
    data.iter()
        .map(|c| {
            let r = &c.record;
            CaseRow {
                source_row: r.source_row,
                entry_date: format_date(r.entry_date),
                first_inspection_date: format_date(r.first_inspection_date),
                conclusion_date: format_date(r.conclusion_date),
                risk_classification: r.risk_classification.clone(),
                status: r.status.clone(),
                territory: r.territory.clone().unwrap_or_default(),
                coordination_unit: r.coordination_unit.clone().unwrap_or_default(),
                first_deadline: format_date(c.first_deadline),
                second_deadline: format_date(c.second_deadline),
                met_first_deadline: c.met_first_deadline,
                met_second_deadline: c.met_second_deadline,
            }
        })
        .collect()
}

pub fn dimension_rows(data: &[DimensionSummary]) -> Vec<DimensionRow> {
    data.iter()
        .map(|d| DimensionRow {
            value: d.value.clone(),
            entries: d.entries,
            met_first_count: d.met_first_count,
            met_second_count: d.met_second_count,
        })
        .collect()
}

/// Sheets for the workbook export, in display order.
pub fn report_sheets(report: &IndicatorReport) -> IndexMap<String, SheetData> {
    let mut sheets = IndexMap::new();
    sheets.insert(
        "Indicators".to_string(),
        SheetData::from_rows(&summary_rows(std::slice::from_ref(&report.totals))),
    );
    sheets.insert(
        "By period".to_string(),
        SheetData::from_rows(&summary_rows(&report.by_period)),
    );
    if let Some(detail) = &report.detail {
        sheets.insert(
            "Cases".to_string(),
            SheetData::from_rows(&case_rows(&detail.classified)),
        );
        sheets.insert(
            "Late first inspection (30 days)".to_string(),
            SheetData::from_rows(&case_rows(&detail.late_first)),
        );
        sheets.insert(
            "Late conclusion (90 days)".to_string(),
            SheetData::from_rows(&case_rows(&detail.late_second)),
        );
        if let Some(rows) = &detail.by_territory {
            sheets.insert(
                "By territory".to_string(),
                SheetData::from_rows(&dimension_rows(rows)),
            );
        }
        if let Some(rows) = &detail.by_coordination {
            sheets.insert(
                "By coordination".to_string(),
                SheetData::from_rows(&dimension_rows(rows)),
            );
        }
    }
    sheets
}

pub fn generate_summary(report: &IndicatorReport) -> SummaryStats {
    let t = &report.totals;
    SummaryStats {
        entries: t.entries,
        met_first_count: t.met_first_count,
        met_first_pct: t.met_first_pct,
        met_second_count: t.met_second_count,
        met_second_pct: t.met_second_pct,
        late_first_count: t.entries - t.met_first_count,
        late_second_count: t.entries - t.met_second_count,
    }
}
