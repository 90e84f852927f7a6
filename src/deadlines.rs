use chrono::{Days, NaiveDate};

use crate::types::{CaseRecord, ClassifiedRecord};

/// Days after entry within which the first inspection must happen.
pub const FIRST_DEADLINE_DAYS: u64 = 30;
/// Days after entry within which the case must be concluded.
pub const SECOND_DEADLINE_DAYS: u64 = 90;

fn deadline(entry: Option<NaiveDate>, days: u64) -> Option<NaiveDate> {
    entry.and_then(|d| d.checked_add_days(Days::new(days)))
}

/// Met only when the event happened on or before the deadline.
fn met(event: Option<NaiveDate>, deadline: Option<NaiveDate>) -> bool {
    matches!((event, deadline), (Some(e), Some(d)) if e <= d)
}

pub fn classify_record(record: CaseRecord) -> ClassifiedRecord {
    let first_deadline = deadline(record.entry_date, FIRST_DEADLINE_DAYS);
    let second_deadline = deadline(record.entry_date, SECOND_DEADLINE_DAYS);
    ClassifiedRecord {
        met_first_deadline: met(record.first_inspection_date, first_deadline),
        met_second_deadline: met(record.conclusion_date, second_deadline),
        first_deadline,
        second_deadline,
        record,
    }
}

pub fn classify(records: Vec<CaseRecord>) -> Vec<ClassifiedRecord> {
    records.into_iter().map(classify_record).collect()
}
