//! Typed errors for the validation the engine performs itself
//!
//! Loader and CLI failures go through `anyhow` with context instead.

use chrono::NaiveDate;
use thiserror::Error;

/// Reporting window or input date could not be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("window start {start} is after window end {end}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },

    #[error("unrecognized date '{0}', expected YYYY-MM-DD or an ISO-8601 timestamp")]
    InvalidDate(String),
}

/// Segment filter value did not name a known segment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentFilterError {
    #[error("unknown segment '{given}', expected All or one of: {accepted}")]
    Unknown { given: String, accepted: String },
}
