//! JSON serde for the export wire format.
//!
//! The wire format uses camelCase field names, phases as `"phase1"`..`"phase3"`,
//! per-phase progress as bare integers, and ISO-8601 local timestamps.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::MemoryEntry;
use crate::phase::Phase;
use crate::progress::ProgressRecord;
use crate::time::{parse_iso8601, to_iso8601};

/// Version stamped into exports. Imports accept any version with the same
/// major number.
pub const CURRENT_VERSION: &str = "1.0";

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

#[derive(Debug)]
pub enum WireError {
    Json(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Json(e) => write!(f, "malformed JSON: {e}"),
            WireError::Invalid(msg) => write!(f, "invalid export: {msg}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Json(e)
    }
}

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug)]
pub struct WireExport {
    pub version: String,
    #[serde(rename = "exportedAt", default)]
    pub exported_at: String,
    pub entries: Vec<WireEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    pub id: String,
    pub reference: String,
    #[serde(default)]
    pub verse_text: BTreeMap<u32, String>,
    #[serde(default)]
    pub current_phase: Phase,
    #[serde(default)]
    pub phase1_progress: u32,
    #[serde(default)]
    pub phase2_progress: u32,
    #[serde(default)]
    pub phase3_progress: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completion_date: Option<String>,
    pub date_added: String,
    #[serde(default = "default_managed")]
    pub is_system_managed: bool,
}

fn default_managed() -> bool {
    true
}

// --- Conversion: Domain → Wire ---

impl WireEntry {
    pub fn from_entry(entry: &MemoryEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            reference: entry.reference.clone(),
            verse_text: entry.verse_text.clone(),
            current_phase: entry.current_phase,
            phase1_progress: entry.phase1_progress.units_completed,
            phase2_progress: entry.phase2_progress.units_completed,
            phase3_progress: entry.phase3_progress.units_completed,
            last_completion_date: entry.last_completion_date.map(to_iso8601),
            date_added: to_iso8601(entry.date_added),
            is_system_managed: entry.is_system_managed,
        }
    }

    // --- Conversion: Wire → Domain ---

    pub fn into_entry(self) -> Result<MemoryEntry, WireError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| WireError::Invalid(format!("bad id '{}': {e}", self.id)))?;
        let date_added = parse_timestamp(&self.date_added, "dateAdded")?;
        let last_completion_date = self
            .last_completion_date
            .as_deref()
            .map(|s| parse_timestamp(s, "lastCompletionDate"))
            .transpose()?;

        for (phase, units) in [
            (Phase::Phase1, self.phase1_progress),
            (Phase::Phase2, self.phase2_progress),
        ] {
            if let Some(threshold) = phase.threshold()
                && units > threshold
            {
                return Err(WireError::Invalid(format!(
                    "{}: {phase} progress {units} exceeds {threshold}",
                    self.reference
                )));
            }
        }

        Ok(MemoryEntry {
            id,
            reference: self.reference,
            verse_text: self.verse_text,
            current_phase: self.current_phase,
            phase1_progress: ProgressRecord::new(self.phase1_progress),
            phase2_progress: ProgressRecord::new(self.phase2_progress),
            phase3_progress: ProgressRecord::new(self.phase3_progress),
            last_completion_date,
            date_added,
            is_system_managed: self.is_system_managed,
        })
    }
}

fn parse_timestamp(s: &str, field: &str) -> Result<NaiveDateTime, WireError> {
    parse_iso8601(s).ok_or_else(|| WireError::Invalid(format!("bad {field} '{s}'")))
}

pub fn import_json(json: &str) -> Result<Vec<MemoryEntry>, WireError> {
    let wire: WireExport = serde_json::from_str(json)?;
    if major(&wire.version) != major(CURRENT_VERSION) {
        return Err(WireError::Invalid(format!(
            "unsupported export version '{}' (expected {CURRENT_VERSION})",
            wire.version
        )));
    }
    wire.entries.into_iter().map(WireEntry::into_entry).collect()
}

pub fn export_json(entries: &[MemoryEntry], as_of: NaiveDateTime) -> Result<String, WireError> {
    let wire = WireExport {
        version: CURRENT_VERSION.to_string(),
        exported_at: to_iso8601(as_of),
        entries: entries.iter().map(WireEntry::from_entry).collect(),
    };
    Ok(serde_json::to_string_pretty(&wire)?)
}
