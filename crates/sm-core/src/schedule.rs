//! Due-today predicate and the completion processor.
//!
//! `process_completion` is the single write path for progress. It mutates the
//! entry in place and does not persist; callers must save the entry (or roll
//! the mutation back) as one logical step, and must serialize concurrent
//! completions of the same entry themselves.

use chrono::NaiveDateTime;

use crate::entry::MemoryEntry;
use crate::error::{Result, SchedulerError};
use crate::phase::Cadence;
use crate::time::{same_day, same_month};

/// Whether the entry requires a completion action for the cadence unit
/// containing `as_of`. Unmanaged entries are always due.
pub fn needs_completion(entry: &MemoryEntry, as_of: NaiveDateTime) -> bool {
    if !entry.is_system_managed {
        return true;
    }
    let Some(last) = entry.last_completion_date else {
        return true;
    };
    match entry.current_phase.cadence() {
        Cadence::Daily => !same_day(last, as_of),
        Cadence::Monthly => !same_month(last, as_of),
    }
}

/// Record a completion at `as_of`.
///
/// Managed entries advance the active phase's record by one cadence unit and
/// transition when the threshold is reached. Unmanaged entries only get the
/// timestamp.
pub fn process_completion(entry: &mut MemoryEntry, as_of: NaiveDateTime) -> Result<()> {
    if !entry.is_system_managed {
        entry.last_completion_date = Some(as_of);
        return Ok(());
    }

    if !needs_completion(entry, as_of) {
        return Err(SchedulerError::AlreadyCompleted {
            phase: entry.current_phase,
            as_of,
        });
    }

    let phase = entry.current_phase;
    let record = entry.progress_mut(phase);
    record.advance(phase);

    if record.is_complete(phase)
        && let Some(next) = phase.next()
    {
        entry.current_phase = next;
    }

    entry.last_completion_date = Some(as_of);
    Ok(())
}

/// Entries that need completion as of `as_of`, in input order.
pub fn due_entries<'a, I>(entries: I, as_of: NaiveDateTime) -> Vec<&'a MemoryEntry>
where
    I: IntoIterator<Item = &'a MemoryEntry>,
{
    entries
        .into_iter()
        .filter(|e| needs_completion(e, as_of))
        .collect()
}
