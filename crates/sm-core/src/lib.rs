//! Scripture memorization scheduler.
//!
//! Tracks a passage through three phases: five days of intensive daily
//! repetition, forty-five days of daily review, then open-ended monthly
//! maintenance. Answers whether an entry is due, records completions with
//! automatic phase transitions, seeds entries imported mid-schedule, and
//! aggregates collection statistics and the daily completion streak.
//!
//! Zero I/O. Every time-sensitive operation takes the caller's local "now";
//! nothing here reads a clock or persists anything.

pub mod constants;
pub mod entry;
pub mod error;
pub mod import;
pub mod phase;
pub mod progress;
pub mod schedule;
pub mod serde_compat;
pub mod stats;
pub mod time;

pub use constants::{PHASE1_REPETITIONS, PHASE1_THRESHOLD, PHASE2_THRESHOLD};
pub use entry::MemoryEntry;
pub use error::{Result, SchedulerError};
pub use import::configure_existing;
pub use phase::{Cadence, Phase};
pub use progress::ProgressRecord;
pub use schedule::{due_entries, needs_completion, process_completion};
pub use serde_compat::{CURRENT_VERSION, WireError, export_json, import_json};
pub use stats::{Statistics, completion_streak, statistics};
pub use time::{day_of, parse_iso8601, same_day, same_month, to_iso8601};
