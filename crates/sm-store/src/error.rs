use std::fmt;

use sm_core::{SchedulerError, WireError};
use uuid::Uuid;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Scheduler(SchedulerError),
    NotFound(Uuid),
    InvalidData(String),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Scheduler(e) => write!(f, "{e}"),
            StoreError::NotFound(id) => write!(f, "entry not found: {id}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Scheduler(e) => Some(e),
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<SchedulerError> for StoreError {
    fn from(e: SchedulerError) -> Self {
        StoreError::Scheduler(e)
    }
}

impl From<WireError> for StoreError {
    fn from(e: WireError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

impl StoreError {
    /// The entry was already completed for this cadence unit.
    pub fn is_already_completed(&self) -> bool {
        matches!(
            self,
            StoreError::Scheduler(SchedulerError::AlreadyCompleted { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
