//! Local SQLite tracker adapter.
//!
//! # Responsibility
//! - Serve the tracker primitives from a beads-shaped SQLite file
//!   (`issues`, `labels`), for offline runs and as a test double.
//!
//! # Invariants
//! - Label writes never create records; labels on unknown ids fail.
//! - `add_labels_bulk` is all-or-nothing: one failing pair rolls back the
//!   whole batch.
//! - Notes are appended newline-separated, never rewritten.

use crate::db::{open_db, open_db_in_memory};
use crate::model::label::LabelPair;
use crate::model::record::NewRecord;
use crate::tracker::{Row, Tracker, TrackerError, TrackerResult};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

/// Tracker backed by an owned SQLite connection.
pub struct SqliteTracker {
    conn: Connection,
}

impl SqliteTracker {
    /// Wraps a migrated connection after checking the tracker tables exist.
    pub fn try_new(conn: Connection) -> TrackerResult<Self> {
        for table in ["issues", "labels"] {
            if !table_exists(&conn, table)? {
                return Err(TrackerError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    /// Opens (or creates) a tracker database file.
    pub fn open(path: impl AsRef<Path>) -> TrackerResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh in-memory tracker.
    pub fn open_in_memory() -> TrackerResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Labels currently attached to `id`, sorted.
    pub fn labels_for(&self, id: &str) -> TrackerResult<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label FROM labels WHERE issue_id = ?1 ORDER BY label;")?;
        let labels = stmt
            .query_map([id], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(labels)
    }

    /// Accumulated notes of `id`.
    pub fn notes_for(&self, id: &str) -> TrackerResult<Option<String>> {
        let notes = self
            .conn
            .query_row("SELECT notes FROM issues WHERE id = ?1;", [id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(notes)
    }

    /// Number of records in the tracker.
    pub fn record_count(&self) -> TrackerResult<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues;", [], |row| row.get::<_, i64>(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn exists(&self, id: &str) -> TrackerResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM issues WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl Tracker for SqliteTracker {
    fn query(&self, sql: &str) -> TrackerResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut decoded = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                decoded.insert(column.clone(), json_value(row.get_ref(idx)?));
            }
            out.push(decoded);
        }
        Ok(out)
    }

    fn show(&self, id: &str) -> TrackerResult<Option<String>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, title, description, status, issue_type, priority, notes, external_ref
                 FROM issues
                 WHERE id = ?1;",
                [id],
                |row| {
                    Ok(ShowRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        status: row.get(3)?,
                        issue_type: row.get(4)?,
                        priority: row.get(5)?,
                        notes: row.get(6)?,
                        external_ref: row.get(7)?,
                    })
                },
            )
            .optional()?;

        let Some(found) = found else {
            return Ok(None);
        };
        let labels = self.labels_for(id)?;
        Ok(Some(found.render(&labels)))
    }

    fn record_exists(&self, id: &str) -> TrackerResult<bool> {
        self.exists(id)
    }

    fn create_record(&mut self, record: &NewRecord) -> TrackerResult<()> {
        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO issues (id, title, description, issue_type, priority, external_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.id,
                record.title,
                record.description,
                record.issue_type,
                record.priority,
                record.external_ref,
            ],
        )?;
        if inserted == 0 {
            return Err(TrackerError::AlreadyExists(record.id.clone()));
        }
        for label in &record.labels {
            tx.execute(
                "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2);",
                params![record.id, label],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add_label(&mut self, id: &str, label: &str) -> TrackerResult<()> {
        if !self.exists(id)? {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2);",
            params![id, label],
        )?;
        Ok(())
    }

    fn add_labels_bulk(&mut self, pairs: &[LabelPair]) -> TrackerResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2);")?;
            for pair in pairs {
                // Unknown ids trip the foreign key and abort the batch.
                stmt.execute(params![pair.record_id, pair.label])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn append_note(&mut self, id: &str, note: &str) -> TrackerResult<()> {
        let changed = self.conn.execute(
            "UPDATE issues
             SET
                notes = CASE WHEN notes = '' THEN ?2 ELSE notes || char(10) || ?2 END,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, note],
        )?;
        if changed == 0 {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

struct ShowRow {
    id: String,
    title: String,
    description: String,
    status: String,
    issue_type: String,
    priority: i64,
    notes: String,
    external_ref: Option<String>,
}

impl ShowRow {
    fn render(&self, labels: &BTreeSet<String>) -> String {
        let mut text = format!(
            "{}: {}\nStatus: {}  Type: {}  Priority: P{}\n",
            self.id, self.title, self.status, self.issue_type, self.priority
        );
        if let Some(external_ref) = self.external_ref.as_ref() {
            text.push_str(&format!("External: {external_ref}\n"));
        }
        if !labels.is_empty() {
            let joined = labels.iter().cloned().collect::<Vec<_>>().join(", ");
            text.push_str(&format!("Labels: {joined}\n"));
        }
        if !self.description.is_empty() {
            text.push_str(&format!("\nDescription:\n{}\n", self.description));
        }
        if !self.notes.is_empty() {
            text.push_str(&format!("\nNotes:\n{}\n", self.notes));
        }
        text
    }
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(number) => number.into(),
        ValueRef::Real(number) => serde_json::Number::from_f64(number)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn table_exists(conn: &Connection, table: &str) -> TrackerResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::SqliteTracker;
    use crate::model::record::NewRecord;
    use crate::tracker::{Tracker, TrackerError};
    use rusqlite::Connection;

    #[test]
    fn rejects_connection_without_tracker_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteTracker::try_new(conn).err().unwrap();
        assert!(matches!(err, TrackerError::MissingRequiredTable("issues")));
    }

    #[test]
    fn show_renders_labels_and_notes() {
        let mut tracker = SqliteTracker::open_in_memory().unwrap();
        tracker
            .create_record(
                &NewRecord::task("iv-1", "Title", "Body", &["recovered"])
                    .with_external_ref("git:abc"),
            )
            .unwrap();
        tracker.append_note("iv-1", "first").unwrap();
        tracker.append_note("iv-1", "second").unwrap();

        let text = tracker.show("iv-1").unwrap().unwrap();
        assert!(text.starts_with("iv-1: Title"));
        assert!(text.contains("External: git:abc"));
        assert!(text.contains("Labels: recovered"));
        assert!(text.contains("Notes:\nfirst\nsecond"));
        assert_eq!(tracker.show("iv-missing").unwrap(), None);
    }

    #[test]
    fn create_twice_reports_already_exists() {
        let mut tracker = SqliteTracker::open_in_memory().unwrap();
        let record = NewRecord::task("iv-1", "t", "d", &[]);
        tracker.create_record(&record).unwrap();
        let err = tracker.create_record(&record).unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyExists(id) if id == "iv-1"));
        assert_eq!(tracker.record_count().unwrap(), 1);
    }

    #[test]
    fn query_decodes_typed_columns() {
        let mut tracker = SqliteTracker::open_in_memory().unwrap();
        tracker
            .create_record(&NewRecord::task("iv-1", "t", "d", &[]))
            .unwrap();
        let rows = tracker
            .query("select id, priority, external_ref from issues")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "iv-1");
        assert_eq!(rows[0]["priority"], 2);
        assert!(rows[0]["external_ref"].is_null());
    }
}
