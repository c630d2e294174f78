use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // In-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entries (
            id                TEXT PRIMARY KEY,
            reference         TEXT NOT NULL,
            verse_text        TEXT NOT NULL DEFAULT '{}',
            current_phase     TEXT NOT NULL DEFAULT 'phase1',
            phase1_units      INTEGER NOT NULL DEFAULT 0,
            phase2_units      INTEGER NOT NULL DEFAULT 0,
            phase3_units      INTEGER NOT NULL DEFAULT 0,
            last_completion   TEXT,
            date_added        TEXT NOT NULL,
            is_system_managed INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_entries_added ON entries(date_added);
        CREATE INDEX IF NOT EXISTS idx_entries_reference ON entries(reference);
        ",
    )?;

    let previous = get_schema_version(conn)?;
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    if previous.is_none() {
        tracing::info!("initialized schema v{SCHEMA_VERSION}");
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .optional()?;
    Ok(version)
}
