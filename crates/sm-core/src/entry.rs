use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;
use crate::progress::ProgressRecord;

/// A passage being memorized, with its progress through all three phases.
///
/// Mutated only by the completion processor and the import configurator;
/// persisting the result is the caller's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    /// Opaque book/chapter/verse locator.
    pub reference: String,
    /// Verse number to text. Iterates in verse-number order.
    pub verse_text: BTreeMap<u32, String>,
    pub current_phase: Phase,
    pub phase1_progress: ProgressRecord,
    pub phase2_progress: ProgressRecord,
    pub phase3_progress: ProgressRecord,
    /// `None` until the first completion.
    pub last_completion_date: Option<NaiveDateTime>,
    pub date_added: NaiveDateTime,
    /// False for plain flashcards that sit outside the phase scheduler.
    pub is_system_managed: bool,
}

impl MemoryEntry {
    /// Fresh scheduled entry: Phase 1, all progress zero, never completed.
    pub fn new(reference: &str, date_added: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            verse_text: BTreeMap::new(),
            current_phase: Phase::Phase1,
            phase1_progress: ProgressRecord::default(),
            phase2_progress: ProgressRecord::default(),
            phase3_progress: ProgressRecord::default(),
            last_completion_date: None,
            date_added,
            is_system_managed: true,
        }
    }

    /// Plain flashcard: always available, never advances.
    pub fn new_flashcard(reference: &str, date_added: NaiveDateTime) -> Self {
        Self {
            is_system_managed: false,
            ..Self::new(reference, date_added)
        }
    }

    pub fn with_verse(mut self, number: u32, text: &str) -> Self {
        self.verse_text.insert(number, text.to_string());
        self
    }

    pub fn progress(&self, phase: Phase) -> &ProgressRecord {
        match phase {
            Phase::Phase1 => &self.phase1_progress,
            Phase::Phase2 => &self.phase2_progress,
            Phase::Phase3 => &self.phase3_progress,
        }
    }

    pub fn progress_mut(&mut self, phase: Phase) -> &mut ProgressRecord {
        match phase {
            Phase::Phase1 => &mut self.phase1_progress,
            Phase::Phase2 => &mut self.phase2_progress,
            Phase::Phase3 => &mut self.phase3_progress,
        }
    }

    /// Progress record of the active phase.
    pub fn current_progress(&self) -> &ProgressRecord {
        self.progress(self.current_phase)
    }

    /// Repetitions for the Phase 1 day the user is working on next.
    /// Display only; `None` outside Phase 1 or for flashcards.
    pub fn todays_repetitions(&self) -> Option<u32> {
        if !self.is_system_managed || self.current_phase != Phase::Phase1 {
            return None;
        }
        let unit = self.phase1_progress.units_completed + 1;
        match Phase::Phase1.repetitions(unit) {
            0 => None,
            reps => Some(reps),
        }
    }

    /// Cadence units left before the active phase transitions.
    pub fn units_remaining(&self) -> Option<u32> {
        if !self.is_system_managed {
            return None;
        }
        self.current_progress().remaining(self.current_phase)
    }

    /// Verses in verse-number order.
    pub fn verses(&self) -> impl Iterator<Item = (u32, &str)> {
        self.verse_text.iter().map(|(n, t)| (*n, t.as_str()))
    }

    /// Verse text joined in order, for display.
    pub fn full_text(&self) -> String {
        self.verses()
            .map(|(_, t)| t)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
