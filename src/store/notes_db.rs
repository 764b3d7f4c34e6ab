use super::RecentFonts;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, types::Type};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL DEFAULT '',
    position_x INTEGER NOT NULL,
    position_y INTEGER NOT NULL,
    size_width INTEGER NOT NULL,
    size_height INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_top_most INTEGER NOT NULL DEFAULT 0,
    background_color TEXT NOT NULL,
    font_family TEXT NOT NULL,
    font_size INTEGER NOT NULL,
    font_color TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recent_fonts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    font_name TEXT UNIQUE NOT NULL,
    last_used INTEGER NOT NULL
);
";

#[derive(Debug, Error)]
pub enum NotesStoreError {
    #[error("Failed preparing database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Note {0} is not found")]
    NoteNotFound(Uuid),
}

/// One persisted note, colors kept as `#RRGGBB` text.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub id: Uuid,
    pub content: String,
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_top_most: bool,
    pub background_color: String,
    pub font_family: String,
    pub font_size: i32,
    pub font_color: String,
}

/// SQLite file holding notes and the recent fonts ledger.
///
/// A connection lives only for the duration of one call and is dropped on every exit
/// path, errors included.
#[derive(Debug, Clone)]
pub struct NotesDatabase {
    path: PathBuf,
}

fn text_conversion_error<E>(index: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
}

fn parse_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| text_conversion_error(index, e))
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRecord> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(NoteRecord {
        id: Uuid::parse_str(&id).map_err(|e| text_conversion_error(0, e))?,
        content: row.get(1)?,
        position: (row.get(2)?, row.get(3)?),
        size: (row.get(4)?, row.get(5)?),
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
        is_top_most: row.get(8)?,
        background_color: row.get(9)?,
        font_family: row.get(10)?,
        font_size: row.get(11)?,
        font_color: row.get(12)?,
    })
}

#[allow(clippy::missing_errors_doc)]
impl NotesDatabase {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the database directory and tables if missing
    pub fn try_init(&self) -> Result<(), NotesStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        self.with_connection(|_| Ok(()))?;
        tracing::info!(db_path = %self.path.display(), "notes database initialized");
        Ok(())
    }

    fn with_connection<T, F>(&self, f: F) -> Result<T, NotesStoreError>
    where
        F: FnOnce(&Connection) -> Result<T, NotesStoreError>,
    {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        f(&conn)
    }

    // recent fonts ledger

    pub fn try_record_font_used(&self, name: &str) -> Result<(), NotesStoreError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO recent_fonts (font_name, last_used) VALUES (?1, ?2)",
                params![name, Utc::now().timestamp_millis()],
            )?;
            Ok(())
        })
    }

    pub fn try_list_recent_fonts(&self, limit: usize) -> Result<Vec<String>, NotesStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT font_name FROM recent_fonts ORDER BY last_used DESC, id DESC LIMIT ?1",
            )?;
            let fonts = stmt
                .query_map(params![limit], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(fonts)
        })
    }

    // notes

    /// Inserts the note or overwrites the stored one with the same id
    pub fn try_save_note(&self, note: &NoteRecord) -> Result<(), NotesStoreError> {
        self.with_connection(|conn| {
            conn.execute(
                r"INSERT INTO notes (
                    id, content, position_x, position_y, size_width, size_height,
                    created_at, updated_at, is_top_most, background_color,
                    font_family, font_size, font_color
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content,
                    position_x = excluded.position_x,
                    position_y = excluded.position_y,
                    size_width = excluded.size_width,
                    size_height = excluded.size_height,
                    updated_at = excluded.updated_at,
                    is_top_most = excluded.is_top_most,
                    background_color = excluded.background_color,
                    font_family = excluded.font_family,
                    font_size = excluded.font_size,
                    font_color = excluded.font_color",
                params![
                    note.id.to_string(),
                    note.content,
                    note.position.0,
                    note.position.1,
                    note.size.0,
                    note.size.1,
                    note.created_at.to_rfc3339(),
                    note.updated_at.to_rfc3339(),
                    note.is_top_most,
                    note.background_color,
                    note.font_family,
                    note.font_size,
                    note.font_color,
                ],
            )?;
            Ok(())
        })
    }

    pub fn try_list_notes(&self) -> Result<Vec<NoteRecord>, NotesStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r"SELECT id, content, position_x, position_y, size_width, size_height,
                    created_at, updated_at, is_top_most, background_color,
                    font_family, font_size, font_color
                FROM notes ORDER BY created_at",
            )?;
            let notes = stmt
                .query_map([], read_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    pub fn try_delete_note(&self, id: Uuid) -> Result<(), NotesStoreError> {
        self.with_connection(|conn| {
            match conn.execute("DELETE FROM notes WHERE id = ?1", params![id.to_string()])? {
                0 => Err(NotesStoreError::NoteNotFound(id)),
                _ => Ok(()),
            }
        })
    }
}

impl RecentFonts for NotesDatabase {
    fn record_font_used(&self, name: &str) {
        if let Err(e) = self.try_record_font_used(name) {
            tracing::warn!("failed recording recent font {name}: {e}");
        }
    }

    fn list_recent_fonts(&self, limit: usize) -> Vec<String> {
        self.try_list_recent_fonts(limit).unwrap_or_else(|e| {
            tracing::warn!("failed listing recent fonts: {e}");
            Vec::new()
        })
    }
}

#[cfg(test)]
fn temp_database() -> (tempfile::TempDir, NotesDatabase) {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let db = NotesDatabase::new(dir.path().join("db").join("notes.sqlite"));
    db.try_init().expect("database must initialize");
    (dir, db)
}

#[cfg(test)]
fn sample_record(content: &str) -> NoteRecord {
    let now = Utc::now();
    NoteRecord {
        id: Uuid::new_v4(),
        content: content.to_string(),
        position: (120, 80),
        size: (300, 200),
        created_at: now,
        updated_at: now,
        is_top_most: false,
        background_color: "#FFFF99".to_string(),
        font_family: "Arial".to_string(),
        font_size: 12,
        font_color: "#000000".to_string(),
    }
}

#[test]
fn recent_fonts_are_ordered_by_last_use() {
    let (_dir, db) = temp_database();
    db.record_font_used("Arial");
    db.record_font_used("Times New Roman");
    db.record_font_used("Arial");
    assert_eq!(db.list_recent_fonts(2), vec!["Arial", "Times New Roman"]);
    assert_eq!(db.list_recent_fonts(10).len(), 2);
}

#[test]
fn unreachable_ledger_degrades_to_empty() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    // a directory cannot be opened as a database file
    let db = NotesDatabase::new(dir.path());
    db.record_font_used("Arial");
    assert!(db.list_recent_fonts(5).is_empty());
}

#[test]
fn save_list_update_delete_notes() {
    let (_dir, db) = temp_database();
    let mut record = sample_record("first");
    db.try_save_note(&record).expect("insert must succeed");
    db.try_save_note(&sample_record("second"))
        .expect("insert must succeed");
    assert_eq!(db.try_list_notes().expect("list must succeed").len(), 2);

    record.content = "first, edited".to_string();
    record.is_top_most = true;
    db.try_save_note(&record).expect("update must succeed");
    let notes = db.try_list_notes().expect("list must succeed");
    let stored = notes
        .iter()
        .find(|note| note.id == record.id)
        .expect("note must be stored");
    assert_eq!(stored.content, "first, edited");
    assert!(stored.is_top_most);

    db.try_delete_note(record.id).expect("delete must succeed");
    assert!(matches!(
        db.try_delete_note(record.id),
        Err(NotesStoreError::NoteNotFound(_))
    ));
    assert_eq!(db.try_list_notes().expect("list must succeed").len(), 1);
}
