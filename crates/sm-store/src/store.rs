use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use sm_core::{
    MemoryEntry, Phase, ProgressRecord, Statistics, completion_streak, configure_existing,
    needs_completion, parse_iso8601, process_completion, statistics, to_iso8601,
};

use crate::error::{Result, StoreError};
use crate::schema;

const ENTRY_COLUMNS: &str = "id, reference, verse_text, current_phase, phase1_units, phase2_units, \
     phase3_units, last_completion, date_added, is_system_managed";

/// Column values of one `entries` row, before validation.
struct RawEntry {
    id: String,
    reference: String,
    verse_text: String,
    current_phase: String,
    phase1_units: u32,
    phase2_units: u32,
    phase3_units: u32,
    last_completion: Option<String>,
    date_added: String,
    is_system_managed: bool,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            reference: row.get(1)?,
            verse_text: row.get(2)?,
            current_phase: row.get(3)?,
            phase1_units: row.get(4)?,
            phase2_units: row.get(5)?,
            phase3_units: row.get(6)?,
            last_completion: row.get(7)?,
            date_added: row.get(8)?,
            is_system_managed: row.get::<_, i32>(9)? != 0,
        })
    }

    fn into_entry(self) -> Result<MemoryEntry> {
        let verse_text: BTreeMap<u32, String> = serde_json::from_str(&self.verse_text)
            .map_err(|e| StoreError::InvalidData(format!("verse text of {}: {e}", self.id)))?;
        let current_phase: Phase = self
            .current_phase
            .parse()
            .map_err(StoreError::InvalidData)?;
        let last_completion_date = self
            .last_completion
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(MemoryEntry {
            id: parse_uuid(&self.id)?,
            reference: self.reference,
            verse_text,
            current_phase,
            phase1_progress: ProgressRecord::new(self.phase1_units),
            phase2_progress: ProgressRecord::new(self.phase2_units),
            phase3_progress: ProgressRecord::new(self.phase3_units),
            last_completion_date,
            date_added: parse_timestamp(&self.date_added)?,
            is_system_managed: self.is_system_managed,
        })
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Save ---

    /// Insert or replace an entry.
    pub fn save_entry(&self, entry: &MemoryEntry) -> Result<()> {
        save_entry_on(&self.conn, entry)
    }

    /// Insert or replace many entries in one transaction.
    pub fn save_entries(&self, entries: &[MemoryEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries {
            save_entry_on(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_entry(&self, id: Uuid) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", [id.to_string()])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!("deleted entry {id}");
        Ok(())
    }

    // --- Load ---

    pub fn load_entry(&self, id: Uuid) -> Result<MemoryEntry> {
        load_entry_on(&self.conn, id)
    }

    /// All entries, oldest first. One query, so a consistent snapshot.
    pub fn load_entries(&self) -> Result<Vec<MemoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY date_added, rowid"
        ))?;
        let rows: Vec<RawEntry> = stmt
            .query_map([], RawEntry::from_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(RawEntry::into_entry).collect()
    }

    /// Resolve an entry by a unique prefix of its id.
    pub fn find_entry(&self, id_prefix: &str) -> Result<MemoryEntry> {
        let prefix = id_prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(StoreError::InvalidData("empty entry id".to_string()));
        }
        if let Ok(id) = Uuid::parse_str(&prefix) {
            return self.load_entry(id);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id FROM entries WHERE substr(id, 1, length(?1)) = ?1 LIMIT 2")?;
        let ids: Vec<String> = stmt
            .query_map([&prefix], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        match ids.as_slice() {
            [id] => self.load_entry(parse_uuid(id)?),
            [] => Err(StoreError::InvalidData(format!(
                "no entry matches id '{prefix}'"
            ))),
            _ => Err(StoreError::InvalidData(format!(
                "id prefix '{prefix}' is ambiguous"
            ))),
        }
    }

    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // --- Scheduler operations with persistence ---

    /// Load, complete, and save an entry inside one transaction.
    /// Nothing is written unless the completion succeeds and commits.
    ///
    /// The transaction takes the write lock before reading, so a second
    /// connection completing the same entry waits on `busy_timeout` and then
    /// sees the first completion.
    pub fn complete_entry(&self, id: Uuid, as_of: NaiveDateTime) -> Result<MemoryEntry> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let mut entry = load_entry_on(&tx, id)?;
        process_completion(&mut entry, as_of)?;

        let persisted = save_entry_on(&tx, &entry).and_then(|()| Ok(tx.commit()?));
        if let Err(e) = persisted {
            tracing::warn!("completion of {id} rolled back: {e}");
            return Err(e);
        }
        Ok(entry)
    }

    /// Complete an in-memory entry and persist it. If persisting fails the
    /// in-memory mutation is undone so caller state matches the store.
    pub fn commit_completion(&self, entry: &mut MemoryEntry, as_of: NaiveDateTime) -> Result<()> {
        let snapshot = entry.clone();
        process_completion(entry, as_of)?;
        if let Err(e) = self.save_entry(entry) {
            tracing::warn!("completion of {} rolled back: {e}", entry.id);
            *entry = snapshot;
            return Err(e);
        }
        Ok(())
    }

    /// Seed `entry` mid-schedule and save it.
    pub fn import_entry(
        &self,
        mut entry: MemoryEntry,
        phase: Phase,
        completed_count: i64,
        completed_this_unit: bool,
        as_of: NaiveDateTime,
    ) -> Result<MemoryEntry> {
        configure_existing(&mut entry, phase, completed_count, completed_this_unit, as_of)?;
        self.save_entry(&entry)?;
        Ok(entry)
    }

    pub fn due_entries(&self, as_of: NaiveDateTime) -> Result<Vec<MemoryEntry>> {
        let mut entries = self.load_entries()?;
        entries.retain(|e| needs_completion(e, as_of));
        Ok(entries)
    }

    pub fn statistics(&self, as_of: NaiveDateTime) -> Result<Statistics> {
        Ok(statistics(&self.load_entries()?, as_of))
    }

    pub fn completion_streak(&self, as_of: NaiveDateTime) -> Result<u32> {
        Ok(completion_streak(&self.load_entries()?, as_of))
    }
}

fn save_entry_on(conn: &Connection, entry: &MemoryEntry) -> Result<()> {
    let verse_text = serde_json::to_string(&entry.verse_text)
        .map_err(|e| StoreError::InvalidData(format!("verse text of {}: {e}", entry.id)))?;
    conn.execute(
        "INSERT OR REPLACE INTO entries (id, reference, verse_text, current_phase, phase1_units,
             phase2_units, phase3_units, last_completion, date_added, is_system_managed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.id.to_string(),
            entry.reference,
            verse_text,
            entry.current_phase.as_str(),
            entry.phase1_progress.units_completed,
            entry.phase2_progress.units_completed,
            entry.phase3_progress.units_completed,
            entry.last_completion_date.map(to_iso8601),
            to_iso8601(entry.date_added),
            entry.is_system_managed as i32,
        ],
    )?;
    tracing::debug!(
        "saved entry {} ({}, {})",
        entry.id,
        entry.reference,
        entry.current_phase
    );
    Ok(())
}

fn load_entry_on(conn: &Connection, id: Uuid) -> Result<MemoryEntry> {
    let raw = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
            [id.to_string()],
            RawEntry::from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound(id))?;
    raw.into_entry()
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    parse_iso8601(s).ok_or_else(|| StoreError::InvalidData(format!("invalid timestamp '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 3)
            .unwrap()
            .and_hms_opt(20, 15, 0)
            .unwrap()
    }

    fn make_entry(reference: &str) -> MemoryEntry {
        MemoryEntry::new(reference, today())
            .with_verse(1, "In the beginning")
            .with_verse(2, "And the earth was without form")
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let mut entry = make_entry("Gen 1:1-2");
        process_completion(&mut entry, today()).unwrap();

        store.save_entry(&entry).unwrap();
        let loaded = store.load_entry(entry.id).unwrap();
        assert_eq!(loaded, entry);
    }

    #[test]
    fn test_save_overwrites_previous() {
        let store = Store::open_in_memory().unwrap();
        let mut entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();
        entry.reference = "Gen 1:1-3".to_string();
        store.save_entry(&entry).unwrap();

        assert_eq!(store.entry_count().unwrap(), 1);
        assert_eq!(store.load_entry(entry.id).unwrap().reference, "Gen 1:1-3");
    }

    #[test]
    fn test_load_missing() {
        let store = Store::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(store.load_entry(id), Err(StoreError::NotFound(x)) if x == id));
    }

    #[test]
    fn test_load_entries_oldest_first() {
        let store = Store::open_in_memory().unwrap();
        let newer = MemoryEntry::new("B", today());
        let older = MemoryEntry::new("A", today() - Duration::days(3));
        store.save_entries(&[newer, older]).unwrap();

        let refs: Vec<String> = store
            .load_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.reference)
            .collect();
        assert_eq!(refs, vec!["A", "B"]);
    }

    #[test]
    fn test_delete_entry() {
        let store = Store::open_in_memory().unwrap();
        let entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();
        store.delete_entry(entry.id).unwrap();
        assert_eq!(store.entry_count().unwrap(), 0);
        assert!(matches!(
            store.delete_entry(entry.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_complete_entry_persists() {
        let store = Store::open_in_memory().unwrap();
        let entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();

        let done = store.complete_entry(entry.id, today()).unwrap();
        assert_eq!(done.phase1_progress.units_completed, 1);

        let loaded = store.load_entry(entry.id).unwrap();
        assert_eq!(loaded.phase1_progress.units_completed, 1);
        assert_eq!(loaded.last_completion_date, Some(today()));
    }

    #[test]
    fn test_complete_entry_twice_same_day() {
        let store = Store::open_in_memory().unwrap();
        let entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();

        store.complete_entry(entry.id, today()).unwrap();
        let err = store.complete_entry(entry.id, today()).unwrap_err();
        assert!(err.is_already_completed());

        let loaded = store.load_entry(entry.id).unwrap();
        assert_eq!(loaded.phase1_progress.units_completed, 1);
    }

    #[test]
    fn test_complete_entry_missing() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.complete_entry(Uuid::new_v4(), today()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_commit_completion_rolls_back_on_failed_save() {
        let store = Store::open_in_memory().unwrap();
        let mut entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();
        store.conn().execute_batch("DROP TABLE entries;").unwrap();

        let before = entry.clone();
        assert!(store.commit_completion(&mut entry, today()).is_err());
        assert_eq!(entry, before);
    }

    #[test]
    fn test_commit_completion_saves() {
        let store = Store::open_in_memory().unwrap();
        let mut entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();
        store.commit_completion(&mut entry, today()).unwrap();
        assert_eq!(store.load_entry(entry.id).unwrap(), entry);
    }

    #[test]
    fn test_import_entry() {
        let store = Store::open_in_memory().unwrap();
        let entry = store
            .import_entry(make_entry("Gen 1:1"), Phase::Phase2, 30, false, today())
            .unwrap();
        let loaded = store.load_entry(entry.id).unwrap();
        assert_eq!(loaded.current_phase, Phase::Phase2);
        assert_eq!(loaded.phase2_progress.units_completed, 30);
        assert!(needs_completion(&loaded, today()));
    }

    #[test]
    fn test_import_entry_negative_count_not_saved() {
        let store = Store::open_in_memory().unwrap();
        let result = store.import_entry(make_entry("Gen 1:1"), Phase::Phase1, -3, false, today());
        assert!(matches!(result, Err(StoreError::Scheduler(_))));
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_find_entry_by_prefix() {
        let store = Store::open_in_memory().unwrap();
        let entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();

        let id = entry.id.to_string();
        assert_eq!(store.find_entry(&id[..8]).unwrap().id, entry.id);
        assert_eq!(store.find_entry(&id).unwrap().id, entry.id);
        assert!(store.find_entry("zzzz").is_err());
        assert!(store.find_entry("").is_err());
    }

    #[test]
    fn test_statistics_and_streak() {
        let store = Store::open_in_memory().unwrap();
        let a = make_entry("A");
        let b = make_entry("B");
        store.save_entries(&[a.clone(), b]).unwrap();
        store.complete_entry(a.id, today()).unwrap();

        let stats = store.statistics(today()).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.phase1_count, 2);
        assert_eq!(stats.due_today_count, 1);
        assert_eq!(store.due_entries(today()).unwrap().len(), 1);
        assert_eq!(store.completion_streak(today()).unwrap(), 1);
    }

    #[test]
    fn test_corrupt_phase_reported() {
        let store = Store::open_in_memory().unwrap();
        let entry = make_entry("Gen 1:1");
        store.save_entry(&entry).unwrap();
        store
            .conn()
            .execute("UPDATE entries SET current_phase = 'phase9'", [])
            .unwrap();
        assert!(matches!(
            store.load_entry(entry.id),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_complete_entry_failed_save_leaves_row_untouched() {
        let store = Store::open_in_memory().unwrap();
        let entry = make_entry("Gen 1:3");
        store.save_entry(&entry).unwrap();
        // INSERT OR REPLACE fires insert triggers, so this fails the save
        // after the load inside complete_entry has succeeded.
        store
            .conn()
            .execute_batch(
                "CREATE TRIGGER block_writes BEFORE INSERT ON entries
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let result = store.complete_entry(entry.id, today());
        assert!(matches!(result, Err(StoreError::Sqlite(_))));

        store.conn().execute_batch("DROP TRIGGER block_writes").unwrap();
        let loaded = store.load_entry(entry.id).unwrap();
        assert_eq!(loaded, entry);
        assert_eq!(loaded.phase1_progress.units_completed, 0);
        assert!(loaded.last_completion_date.is_none());

        // The connection is usable again once writes are allowed.
        let done = store.complete_entry(entry.id, today()).unwrap();
        assert_eq!(done.phase1_progress.units_completed, 1);
    }

    #[test]
    fn test_concurrent_completion_counts_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memory.db");
        let holder = Store::open(&path).unwrap();
        let other = Store::open(&path).unwrap();
        let entry = make_entry("Gen 1:4");
        holder.save_entry(&entry).unwrap();

        // Hold the write lock with the entry already completed but not yet
        // committed, then let a second connection try the same completion.
        holder.conn().execute_batch("BEGIN IMMEDIATE").unwrap();
        let mut first = entry.clone();
        process_completion(&mut first, today()).unwrap();
        holder.save_entry(&first).unwrap();

        let id = entry.id;
        let later = today() + Duration::minutes(5);
        let racer = std::thread::spawn(move || other.complete_entry(id, later));

        std::thread::sleep(std::time::Duration::from_millis(200));
        holder.conn().execute_batch("COMMIT").unwrap();

        let result = racer.join().unwrap();
        match result {
            Err(e) => assert!(e.is_already_completed(), "unexpected error: {e}"),
            Ok(e) => panic!("second completion was counted: {:?}", e.phase1_progress),
        }
        let stored = holder.load_entry(entry.id).unwrap();
        assert_eq!(stored.phase1_progress.units_completed, 1);
        assert_eq!(stored.last_completion_date, Some(today()));
    }
}
