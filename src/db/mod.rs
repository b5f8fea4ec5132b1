pub mod models;

use models::{Document, DocumentStatus};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("A document named '{0}' already exists")]
    Conflict(String),
    #[error("Document '{0}' not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Document registry. One connection behind a mutex; callers never hold the
/// guard across an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                doc_type TEXT NOT NULL,
                upload_date TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('pending', 'processed')),
                dirname TEXT NOT NULL UNIQUE,
                file TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Documents ──

    /// Inserts a new record. Name or directory collisions are reported as
    /// [`StoreError::Conflict`].
    pub fn insert_document(&self, doc: &Document) -> Result<()> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO documents (name, doc_type, upload_date, status, dirname, file)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                doc.name,
                doc.doc_type,
                doc.upload_date,
                doc.status,
                doc.dirname,
                doc.file
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Conflict(doc.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_document(&self, name: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                "SELECT name, doc_type, upload_date, status, dirname, file FROM documents WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Document {
                        name: row.get(0)?,
                        doc_type: row.get(1)?,
                        upload_date: row.get(2)?,
                        status: row.get(3)?,
                        dirname: row.get(4)?,
                        file: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    pub fn set_status(&self, name: &str, status: DocumentStatus) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE documents SET status = ?1 WHERE name = ?2",
            params![status, name],
        )?;
        Ok(())
    }

    /// Removes a record whose payload could not be written.
    pub fn discard_document(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM documents WHERE name = ?1", params![name])?;
        Ok(())
    }

    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn document(name: &str, dirname: &str) -> Document {
        Document {
            name: name.into(),
            doc_type: "homework".into(),
            upload_date: Utc.with_ymd_and_hms(2024, 9, 3, 15, 30, 0).unwrap(),
            status: DocumentStatus::Pending,
            dirname: dirname.into(),
            file: format!("{}/file.pdf", dirname),
        }
    }

    #[test]
    fn insert_then_get_round_trips_metadata() {
        let db = Database::open_in_memory().unwrap();
        let doc = document("Math HW 1.pdf", "uploads/math-hw-1");
        db.insert_document(&doc).unwrap();
        db.set_status(&doc.name, DocumentStatus::Processed).unwrap();

        let stored = db.get_document("Math HW 1.pdf").unwrap().unwrap();
        assert_eq!(stored.upload_date, doc.upload_date);
        assert_eq!(stored.status, DocumentStatus::Processed);
        assert_eq!(stored.dirname, "uploads/math-hw-1");
    }

    #[test]
    fn duplicate_name_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.insert_document(&document("a.pdf", "uploads/a")).unwrap();
        let err = db.insert_document(&document("a.pdf", "uploads/a-2")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(name) if name == "a.pdf"));
    }

    #[test]
    fn shared_directory_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.insert_document(&document("Report.pdf", "uploads/report")).unwrap();
        let err = db.insert_document(&document("report.png", "uploads/report")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn missing_document_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_document("nope").unwrap().is_none());
        assert_eq!(db.count_documents().unwrap(), 0);
    }
}
