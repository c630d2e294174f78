use chrono::NaiveDateTime;

use crate::entry::MemoryEntry;
use crate::error::{Result, SchedulerError};
use crate::phase::Phase;

/// Seed a freshly created entry into an arbitrary point of the schedule,
/// for passages the user was already memorizing elsewhere.
///
/// Counts at or above a phase threshold are clamped to `threshold - 1`: an
/// entry that had reached the threshold would already have transitioned.
/// Records of skipped phases stay at zero.
pub fn configure_existing(
    entry: &mut MemoryEntry,
    phase: Phase,
    completed_count: i64,
    completed_this_unit: bool,
    as_of: NaiveDateTime,
) -> Result<()> {
    if completed_count < 0 {
        return Err(SchedulerError::InvalidImportParameters { completed_count });
    }

    let ceiling = match phase.threshold() {
        Some(threshold) => threshold.saturating_sub(1),
        None => u32::MAX,
    };
    let units = u32::try_from(completed_count).unwrap_or(u32::MAX).min(ceiling);

    entry.current_phase = phase;
    entry.progress_mut(phase).units_completed = units;
    entry.last_completion_date = completed_this_unit.then_some(as_of);
    Ok(())
}
