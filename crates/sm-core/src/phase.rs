use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{PHASE1_REPETITIONS, PHASE1_THRESHOLD, PHASE2_THRESHOLD};

/// Recurrence granularity of a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Once per calendar day.
    Daily,
    /// Once per calendar month.
    Monthly,
}

/// One of the three ordered stages of the memorization schedule.
///
/// Cadence, threshold and the repetition schedule are per-variant constants,
/// never per-instance state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Five days of intensive daily repetition.
    #[default]
    Phase1,
    /// Forty-five days of daily review.
    Phase2,
    /// Open-ended monthly maintenance.
    Phase3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Phase1, Phase::Phase2, Phase::Phase3];

    pub fn cadence(self) -> Cadence {
        match self {
            Phase::Phase1 | Phase::Phase2 => Cadence::Daily,
            Phase::Phase3 => Cadence::Monthly,
        }
    }

    /// Cadence units needed to complete the phase. `None` for the
    /// maintenance phase, which never completes.
    pub fn threshold(self) -> Option<u32> {
        match self {
            Phase::Phase1 => Some(PHASE1_THRESHOLD),
            Phase::Phase2 => Some(PHASE2_THRESHOLD),
            Phase::Phase3 => None,
        }
    }

    /// Phase that follows this one on completion.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Phase1 => Some(Phase::Phase2),
            Phase::Phase2 => Some(Phase::Phase3),
            Phase::Phase3 => None,
        }
    }

    /// Display-only repetition figure for a 1-based cadence unit.
    /// Only Phase 1 has a schedule; everything else yields 0.
    pub fn repetitions(self, unit: u32) -> u32 {
        match self {
            Phase::Phase1 if (1..=PHASE1_THRESHOLD).contains(&unit) => {
                PHASE1_REPETITIONS[(unit - 1) as usize]
            }
            _ => 0,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Phase::Phase1 => 1,
            Phase::Phase2 => 2,
            Phase::Phase3 => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Phase1 => "phase1",
            Phase::Phase2 => "phase2",
            Phase::Phase3 => "phase3",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phase1" | "1" => Ok(Phase::Phase1),
            "phase2" | "2" => Ok(Phase::Phase2),
            "phase3" | "3" => Ok(Phase::Phase3),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}
