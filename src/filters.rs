//! Record selection by period and categorical dimensions.
//!
//! `apply_filters` is a plain conjunction of set-membership predicates. It
//! never invents defaults: callers that want "everything" build their
//! selectors with [`FilterCriteria::with_full_domain`].

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::auth::PrivilegeLevel;
use crate::loader::NormalizedDataset;
use crate::types::{CaseRecord, Dimension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodSelector {
    YearMonths { year: i32, months: BTreeSet<u32> },
    /// Inclusive on both ends.
    DateRange { start: NaiveDate, end: NaiveDate },
}

impl PeriodSelector {
    pub fn matches(&self, record: &CaseRecord) -> bool {
        match self {
            PeriodSelector::YearMonths { year, months } => {
                record.entry_year == Some(*year)
                    && record.entry_month.is_some_and(|m| months.contains(&m))
            }
            PeriodSelector::DateRange { start, end } => record
                .entry_date
                .is_some_and(|d| *start <= d && d <= *end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub period: PeriodSelector,
    /// `None` when the dataset has no classification column.
    pub classifications: Option<BTreeSet<String>>,
    pub territories: Option<BTreeSet<String>>,
    pub coordination_units: Option<BTreeSet<String>>,
    /// Territory and coordination selectors are honored only when elevated.
    pub privilege: PrivilegeLevel,
}

impl FilterCriteria {
    pub fn new(period: PeriodSelector, privilege: PrivilegeLevel) -> Self {
        Self {
            period,
            classifications: None,
            territories: None,
            coordination_units: None,
            privilege,
        }
    }

    /// Criteria that keep every record of `period`: each available dimension
    /// selects its full observed domain.
    pub fn with_full_domain(
        dataset: &NormalizedDataset,
        period: PeriodSelector,
        privilege: PrivilegeLevel,
    ) -> Self {
        let domain = |dim: Dimension| {
            dataset
                .schema
                .has(dim)
                .then(|| observed_values(&dataset.records, dim))
        };
        Self {
            period,
            classifications: domain(Dimension::Classification),
            territories: domain(Dimension::Territory),
            coordination_units: domain(Dimension::Coordination),
            privilege,
        }
    }

    pub fn selector(&self, dim: Dimension) -> Option<&BTreeSet<String>> {
        match dim {
            Dimension::Classification => self.classifications.as_ref(),
            Dimension::Territory => self.territories.as_ref(),
            Dimension::Coordination => self.coordination_units.as_ref(),
        }
    }

    pub fn set_selector(&mut self, dim: Dimension, values: Option<BTreeSet<String>>) {
        match dim {
            Dimension::Classification => self.classifications = values,
            Dimension::Territory => self.territories = values,
            Dimension::Coordination => self.coordination_units = values,
        }
    }

    fn dimension_matches(&self, dim: Dimension, record: &CaseRecord) -> bool {
        let honored = match dim {
            Dimension::Classification => true,
            Dimension::Territory | Dimension::Coordination => self.privilege.is_elevated(),
        };
        match self.selector(dim) {
            Some(set) if honored => set.contains(dim.selection_key(record)),
            _ => true,
        }
    }

    pub fn matches(&self, record: &CaseRecord) -> bool {
        self.period.matches(record)
            && self.dimension_matches(Dimension::Classification, record)
            && self.dimension_matches(Dimension::Territory, record)
            && self.dimension_matches(Dimension::Coordination, record)
    }
}

/// Records satisfying every selector, in input order.
pub fn apply_filters(records: &[CaseRecord], criteria: &FilterCriteria) -> Vec<CaseRecord> {
    records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect()
}

/// Distinct selection keys of `dim`; a missing value shows up as `""`.
pub fn observed_values(records: &[CaseRecord], dim: Dimension) -> BTreeSet<String> {
    records
        .iter()
        .map(|r| dim.selection_key(r).to_string())
        .collect()
}

/// Parse a comma-separated list of 1-based indexes into `options`.
///
/// Blank input selects every option. `None` means the input named no valid
/// index (or contained a token that is not one), so the caller should ask
/// again instead of applying an empty selection.
pub fn parse_selection(input: &str, options: &BTreeSet<String>) -> Option<BTreeSet<String>> {
    if input.trim().is_empty() {
        return Some(options.clone());
    }
    let options: Vec<&String> = options.iter().collect();
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| options.get(i))
                .map(|o| (*o).clone())
        })
        .collect::<Option<BTreeSet<String>>>()
        .filter(|set| !set.is_empty())
}

pub fn observed_years(records: &[CaseRecord]) -> BTreeSet<i32> {
    records.iter().filter_map(|r| r.entry_year).collect()
}

pub fn observed_months(records: &[CaseRecord], year: i32) -> BTreeSet<u32> {
    records
        .iter()
        .filter(|r| r.entry_year == Some(year))
        .filter_map(|r| r.entry_month)
        .collect()
}

/// Earliest and latest entry date, if any record has one.
pub fn entry_date_bounds(records: &[CaseRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().filter_map(|r| r.entry_date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}
