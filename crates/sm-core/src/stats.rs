//! Collection-wide statistics and the completion streak. Read-only; call
//! against a consistent snapshot of the collection.

use std::collections::HashSet;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::entry::MemoryEntry;
use crate::phase::Phase;
use crate::schedule::needs_completion;
use crate::time::day_of;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub phase1_count: usize,
    pub phase2_count: usize,
    pub phase3_count: usize,
    /// Flashcards outside the scheduler. Excluded from the phase buckets.
    pub unmanaged_count: usize,
    pub due_today_count: usize,
}

/// Single pass over the collection.
pub fn statistics<'a, I>(entries: I, as_of: NaiveDateTime) -> Statistics
where
    I: IntoIterator<Item = &'a MemoryEntry>,
{
    let mut stats = Statistics::default();
    for entry in entries {
        stats.total += 1;
        if needs_completion(entry, as_of) {
            stats.due_today_count += 1;
        }
        if !entry.is_system_managed {
            stats.unmanaged_count += 1;
            continue;
        }
        match entry.current_phase {
            Phase::Phase1 => stats.phase1_count += 1,
            Phase::Phase2 => stats.phase2_count += 1,
            Phase::Phase3 => stats.phase3_count += 1,
        }
    }
    stats
}

/// Consecutive calendar days with at least one completion, ending today or,
/// if nothing was completed today, yesterday. Zero when both are empty.
pub fn completion_streak<'a, I>(entries: I, as_of: NaiveDateTime) -> u32
where
    I: IntoIterator<Item = &'a MemoryEntry>,
{
    let active: HashSet<NaiveDate> = entries
        .into_iter()
        .filter_map(|e| e.last_completion_date.map(day_of))
        .collect();
    if active.is_empty() {
        return 0;
    }

    let today = day_of(as_of);
    let mut day = if active.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(d) => d,
            None => return 0,
        }
    };

    let mut streak = 0;
    while active.contains(&day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}
