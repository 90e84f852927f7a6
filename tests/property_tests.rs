//! Property-based tests for the indicator pipeline.
//!
//! Records are generated with arbitrary (possibly missing) dates and
//! categories; the properties below must hold for every input.

use chrono::{Datelike, Days, NaiveDate};
use proptest::prelude::*;
use std::collections::BTreeSet;

use visa_indicators::deadlines::{classify, FIRST_DEADLINE_DAYS, SECOND_DEADLINE_DAYS};
use visa_indicators::filters::apply_filters;
use visa_indicators::reports::{aggregate, partition_late};
use visa_indicators::{
    CaseRecord, FilterCriteria, Grouping, PeriodOrder, PeriodSelector, PrivilegeLevel,
};

// =============================================================================
// Test Strategies
// =============================================================================

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Dates within roughly two years of the base date, or missing.
fn opt_date() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::of((0u64..730).prop_map(|d| base() + Days::new(d)))
}

fn record() -> impl Strategy<Value = CaseRecord> {
    (
        opt_date(),
        opt_date(),
        opt_date(),
        prop::sample::select(vec!["Alto", "Médio", "Baixo", ""]),
        prop::option::of(prop::sample::select(vec!["T1", "T2", "T3"])),
    )
        .prop_map(|(entry, first, done, class, terr)| CaseRecord {
            source_row: 0,
            entry_date: entry,
            first_inspection_date: first,
            conclusion_date: done,
            risk_classification: class.to_string(),
            status: String::new(),
            territory: terr.map(str::to_string),
            coordination_unit: None,
            entry_year: entry.map(|d| d.year()),
            entry_month: entry.map(|d| d.month()),
        })
}

fn records() -> impl Strategy<Value = Vec<CaseRecord>> {
    prop::collection::vec(record(), 0..60)
}

fn criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        2023i32..=2024,
        prop::collection::btree_set(1u32..=12, 0..12),
        prop::collection::btree_set(prop::sample::select(vec!["Alto", "Médio", "Baixo", ""]), 0..4),
        prop::bool::ANY,
    )
        .prop_map(|(year, months, classes, elevated)| {
            let privilege = if elevated {
                PrivilegeLevel::Elevated
            } else {
                PrivilegeLevel::Standard
            };
            let mut c = FilterCriteria::new(PeriodSelector::YearMonths { year, months }, privilege);
            c.classifications = Some(classes.into_iter().map(str::to_string).collect());
            c.territories = Some(BTreeSet::from(["T1".to_string(), "T3".to_string()]));
            c
        })
}

proptest! {
    #[test]
    fn met_first_implies_inspection_within_30_days(recs in records()) {
        for c in classify(recs) {
            if c.met_first_deadline {
                let entry = c.record.entry_date.unwrap();
                let first = c.record.first_inspection_date.unwrap();
                prop_assert!(first <= entry + Days::new(FIRST_DEADLINE_DAYS));
            }
            if c.met_second_deadline {
                let entry = c.record.entry_date.unwrap();
                let done = c.record.conclusion_date.unwrap();
                prop_assert!(done <= entry + Days::new(SECOND_DEADLINE_DAYS));
            }
            if c.record.entry_date.is_none() {
                prop_assert!(!c.met_first_deadline && !c.met_second_deadline);
            }
        }
    }

    #[test]
    fn percentages_match_counts(recs in records()) {
        let classified = classify(recs);
        let mut summaries = aggregate(&classified, Grouping::ByPeriod(PeriodOrder::Ascending));
        summaries.extend(aggregate(&classified, Grouping::Total));
        for s in summaries {
            if s.entries == 0 {
                prop_assert_eq!(s.met_first_pct, 0.0);
                prop_assert_eq!(s.met_second_pct, 0.0);
                continue;
            }
            let expected = (s.met_first_count as f64 / s.entries as f64 * 100.0 * 100.0).round() / 100.0;
            prop_assert_eq!(s.met_first_pct, expected);
            prop_assert!((0.0..=100.0).contains(&s.met_first_pct));
            prop_assert!((0.0..=100.0).contains(&s.met_second_pct));
            prop_assert!(s.met_first_count <= s.entries);
        }
    }

    #[test]
    fn grouped_entries_cover_dated_records(recs in records()) {
        let dated = recs.iter().filter(|r| r.entry_date.is_some()).count();
        let classified = classify(recs);
        let groups = aggregate(&classified, Grouping::ByPeriod(PeriodOrder::Descending));
        prop_assert_eq!(groups.iter().map(|g| g.entries).sum::<usize>(), dated);
        prop_assert!(groups.windows(2).all(|w| (w[0].year, w[0].month) > (w[1].year, w[1].month)));
    }

    #[test]
    fn filtering_is_idempotent(recs in records(), c in criteria()) {
        let once = apply_filters(&recs, &c);
        let twice = apply_filters(&once, &c);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn partition_is_exhaustive_and_flag_consistent(recs in records()) {
        let classified = classify(recs);
        let (missed_first, missed_second) = partition_late(&classified);
        let expected_first: Vec<_> = classified.iter().filter(|c| !c.met_first_deadline).cloned().collect();
        let expected_second: Vec<_> = classified.iter().filter(|c| !c.met_second_deadline).cloned().collect();
        prop_assert_eq!(missed_first, expected_first);
        prop_assert_eq!(missed_second, expected_second);
    }
}
