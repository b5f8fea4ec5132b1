use crate::db::models::{Document, DocumentStatus};
use crate::db::{Database, Result, StoreError};
use crate::slug::{sanitize_file_name, slugify, stem};
use chrono::Utc;
use std::path::PathBuf;

/// Directory under the media root that holds one sub-directory per document.
pub const UPLOADS_DIR: &str = "uploads";

/// Uploaded files on disk plus their registry records.
pub struct DocumentStore {
    db: Database,
    media_root: PathBuf,
}

impl DocumentStore {
    pub fn new(db: Database, media_root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            media_root: media_root.into(),
        }
    }

    /// Media-root-relative directory for a document name.
    pub fn dirname_for(name: &str) -> Result<String> {
        let slug = slugify(stem(name));
        if slug.is_empty() {
            return Err(StoreError::Invalid(format!(
                "Document name '{}' has no usable characters",
                name
            )));
        }
        Ok(format!("{}/{}", UPLOADS_DIR, slug))
    }

    /// Stores `file_bytes` under `uploads/<slug(name)>/` and registers the
    /// document. `file_name` is the client's original file name, used for
    /// the payload when it is usable.
    pub fn create(
        &self,
        file_bytes: &[u8],
        file_name: Option<&str>,
        name: &str,
        doc_type: &str,
    ) -> Result<Document> {
        if file_bytes.is_empty() {
            return Err(StoreError::Invalid("The submitted file is empty".into()));
        }
        let dirname = Self::dirname_for(name)?;
        let payload_name = file_name
            .and_then(sanitize_file_name)
            .or_else(|| sanitize_file_name(name))
            .unwrap_or_else(|| "upload".to_string());

        let mut doc = Document {
            name: name.to_string(),
            doc_type: doc_type.to_string(),
            upload_date: Utc::now(),
            status: DocumentStatus::Pending,
            file: format!("{}/{}", dirname, payload_name),
            dirname,
        };
        self.db.insert_document(&doc)?;

        if let Err(e) = self.write_payload(&doc, file_bytes) {
            self.roll_back(&doc);
            return Err(e.into());
        }

        if let Err(e) = self.db.set_status(&doc.name, DocumentStatus::Processed) {
            self.roll_back(&doc);
            return Err(e);
        }
        doc.status = DocumentStatus::Processed;

        tracing::info!(
            name = %doc.name,
            dirname = %doc.dirname,
            bytes = file_bytes.len(),
            "stored document"
        );
        Ok(doc)
    }

    fn write_payload(&self, doc: &Document, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(self.media_root.join(&doc.dirname))?;
        std::fs::write(self.media_root.join(&doc.file), bytes)
    }

    /// Undoes a half-finished `create`: drops the pending record and whatever
    /// part of the payload reached the disk.
    fn roll_back(&self, doc: &Document) {
        if let Err(e) = self.db.discard_document(&doc.name) {
            tracing::error!(name = %doc.name, error = %e, "failed to discard pending document");
        }
        let file = self.absolute_file(doc);
        if file.exists() {
            if let Err(e) = std::fs::remove_file(&file) {
                tracing::error!(path = %file.display(), error = %e, "failed to remove payload");
            }
        }
        // Only succeeds when the directory is empty, which is the case for a
        // directory this call created.
        let _ = std::fs::remove_dir(self.absolute_dir(doc));
    }

    pub fn get(&self, name: &str) -> Result<Document> {
        self.db
            .get_document(name)?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Absolute directory of a document; this is the agent's sandbox root.
    pub fn absolute_dir(&self, doc: &Document) -> PathBuf {
        self.media_root.join(&doc.dirname)
    }

    pub fn absolute_file(&self, doc: &Document) -> PathBuf {
        self.media_root.join(&doc.file)
    }

    pub fn count(&self) -> Result<i64> {
        self.db.count_documents()
    }
}
