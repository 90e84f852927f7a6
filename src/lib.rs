//! Compliance indicators for sanitary-inspection cases.
//!
//! For every case the panel checks two deadlines counted from the entry
//! date: a first inspection within 30 days and a conclusion within 90 days.
//! Data flows one way:
//!
//! raw sheet → [`loader::normalize`] → [`filters::apply_filters`] →
//! [`deadlines::classify`] → [`reports::aggregate`] / [`reports::partition_late`]
//!
//! Every step is a pure function of its input; fetching the sheet
//! ([`source`]) and exporting the workbook ([`output`]) happen outside it.

pub mod auth;
pub mod config;
pub mod deadlines;
pub mod error;
pub mod filters;
pub mod loader;
pub mod output;
pub mod reports;
pub mod source;
pub mod types;
pub mod util;

pub use auth::{Authenticator, PrivilegeLevel, Session, StaticCredentials};
pub use config::{AppConfig, ColumnConfig};
pub use error::{IndicatorError, Result};
pub use filters::{FilterCriteria, PeriodSelector};
pub use loader::{normalize, NormalizedDataset};
pub use reports::{build_report, Grouping, IndicatorReport, PeriodOrder};
pub use types::{CaseRecord, ClassifiedRecord, Dataset, Dimension, PeriodSummary};
