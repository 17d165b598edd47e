//! SQLite-backed storage for extraction results.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::types::{PersistedRecord, StructuredResult};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id     TEXT NOT NULL UNIQUE,
    raw_json    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_created_at ON records (created_at);
";

/// Persistence for extraction results.
///
/// Calls are blocking; async callers run them on `spawn_blocking`.
pub trait RecordStore: Send + Sync {
    /// Insert a new record and return it with its assigned id.
    fn insert(&self, task_id: &str, raw_json: &StructuredResult) -> Result<PersistedRecord, StoreError>;

    fn get(&self, id: i64) -> Result<Option<PersistedRecord>, StoreError>;

    fn get_by_task_id(&self, task_id: &str) -> Result<Option<PersistedRecord>, StoreError>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<PersistedRecord>, StoreError>;

    /// Replace a record's data. Returns the updated record, or `None` if absent.
    fn update(&self, id: i64, raw_json: &StructuredResult) -> Result<Option<PersistedRecord>, StoreError>;

    /// Returns whether a record was deleted.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Cheap connectivity probe.
    fn ping(&self) -> Result<(), StoreError>;
}

/// [`RecordStore`] over a single SQLite connection.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "Opened record store");
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current < SCHEMA_VERSION {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;
        tracing::debug!(version = SCHEMA_VERSION, "Applied record store schema");
    }
    Ok(())
}

/// Current time at the precision stored in the database.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PersistedRecord> {
    let raw: String = row.get(2)?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(PersistedRecord {
        id: row.get(0)?,
        task_id: row.get(1)?,
        raw_json: StructuredResult::from_value(value),
        created_at: parse_timestamp(row, 3)?,
        updated_at: parse_timestamp(row, 4)?,
    })
}

const SELECT_COLUMNS: &str = "SELECT id, task_id, raw_json, created_at, updated_at FROM records";

impl RecordStore for SqliteRecordStore {
    fn insert(&self, task_id: &str, raw_json: &StructuredResult) -> Result<PersistedRecord, StoreError> {
        let json = serde_json::to_string(raw_json)?;
        let now = now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO records (task_id, raw_json, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![task_id, json, format_timestamp(&now)],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, task_id, "Inserted record");
        Ok(PersistedRecord {
            id,
            task_id: task_id.to_string(),
            raw_json: raw_json.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<PersistedRecord>, StoreError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], row_to_record)
            .optional()?;
        Ok(record)
    }

    fn get_by_task_id(&self, task_id: &str) -> Result<Option<PersistedRecord>, StoreError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE task_id = ?1"),
                params![task_id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn update(&self, id: i64, raw_json: &StructuredResult) -> Result<Option<PersistedRecord>, StoreError> {
        let json = serde_json::to_string(raw_json)?;
        let changed = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE records SET raw_json = ?1, updated_at = ?2 WHERE id = ?3",
                params![json, format_timestamp(&now()), id],
            )?
        };
        if changed == 0 {
            return Ok(None);
        }
        tracing::debug!(id, "Updated record");
        self.get(id)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        if changed > 0 {
            tracing::debug!(id, "Deleted record");
        }
        Ok(changed > 0)
    }

    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
