use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use sm_core::{export_json, import_json};

use crate::error::Result;
use crate::store::Store;

impl Store {
    /// Import a JSON export file. Entries are upserted by id.
    /// Returns the number of entries imported.
    pub fn import_json_file(&self, path: &Path) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        self.import_json_str(&json)
    }

    pub fn import_json_str(&self, json: &str) -> Result<usize> {
        let entries = import_json(json)?;
        self.save_entries(&entries)?;
        tracing::info!("imported {} entries", entries.len());
        Ok(entries.len())
    }

    /// Export every entry to a JSON file.
    /// Returns the number of entries written.
    pub fn export_json_file(&self, path: &Path, as_of: NaiveDateTime) -> Result<usize> {
        let (json, count) = self.export_json_string(as_of)?;
        fs::write(path, json)?;
        Ok(count)
    }

    /// Serialize every entry, returning the document and the entry count.
    pub fn export_json_string(&self, as_of: NaiveDateTime) -> Result<(String, usize)> {
        let entries = self.load_entries()?;
        Ok((export_json(&entries, as_of)?, entries.len()))
    }
}
