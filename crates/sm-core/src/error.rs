use std::fmt;

use chrono::NaiveDateTime;

use crate::phase::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The entry was already completed for the cadence unit containing
    /// `as_of`. Expected under normal use (double taps); not corruption.
    AlreadyCompleted { phase: Phase, as_of: NaiveDateTime },
    /// Import asked for a negative completed count.
    InvalidImportParameters { completed_count: i64 },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadyCompleted { phase, as_of } => {
                let unit = match phase.cadence() {
                    crate::Cadence::Daily => "day",
                    crate::Cadence::Monthly => "month",
                };
                write!(f, "already completed this {unit} ({phase}, as of {as_of})")
            }
            SchedulerError::InvalidImportParameters { completed_count } => {
                write!(f, "invalid import: completed count {completed_count} is negative")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

pub type Result<T> = std::result::Result<T, SchedulerError>;
