use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Cadence units completed within one phase.
///
/// Every entry holds one record per phase. Records of finished or skipped
/// phases are retained for history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Days for Phase 1 and 2, months for Phase 3.
    pub units_completed: u32,
}

impl ProgressRecord {
    pub fn new(units_completed: u32) -> Self {
        Self { units_completed }
    }

    /// Whether this record has reached the threshold of `phase`.
    /// Always false for the maintenance phase.
    pub fn is_complete(&self, phase: Phase) -> bool {
        match phase.threshold() {
            Some(threshold) => self.units_completed >= threshold,
            None => false,
        }
    }

    /// Advance by exactly one cadence unit, never past the threshold.
    pub fn advance(&mut self, phase: Phase) {
        let next = self.units_completed.saturating_add(1);
        self.units_completed = match phase.threshold() {
            Some(threshold) => next.min(threshold),
            None => next,
        };
    }

    /// Units left before `phase` completes.
    pub fn remaining(&self, phase: Phase) -> Option<u32> {
        phase
            .threshold()
            .map(|t| t.saturating_sub(self.units_completed))
    }
}
