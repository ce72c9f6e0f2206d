//! File management service.
//!
//! Owns the upload pipeline: extension validation, storage naming, streaming
//! size enforcement, and the listing and deletion rules over the backend.

use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use super::storage::{FileReader, FileStorage, StoredEntry};
use crate::config::Config;

/// Errors raised by the upload pipeline and file lookups.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("no file uploaded")]
    NoFile,

    #[error("unsupported file type: {0:?}")]
    UnsupportedType(String),

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("malformed upload: {0}")]
    Malformed(String),

    #[error("file exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A file in the storage directory, as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    #[serde(rename = "mtime")]
    pub modified: DateTime<Utc>,
    pub url: String,
}

/// File service for managing uploads.
pub struct FileService {
    config: Arc<Config>,
    storage: Arc<dyn FileStorage>,
}

impl FileService {
    /// Create a new file service.
    pub fn new(config: Arc<Config>, storage: Arc<dyn FileStorage>) -> Self {
        Self { config, storage }
    }

    /// Prepare the backend for writes (creates the upload directory).
    pub async fn prepare(&self) -> Result<(), FileError> {
        self.storage.prepare().await?;
        Ok(())
    }

    /// Check a client-supplied file name against the extension allow-list.
    ///
    /// Returns the lowercased extension, including its leading dot.
    pub fn validate_extension(&self, filename: &str) -> Result<String, FileError> {
        let ext = extension_of(filename);
        if ext.is_empty() || !self.is_allowed(&ext) {
            return Err(FileError::UnsupportedType(ext));
        }
        Ok(ext)
    }

    /// Reject byte counts above the configured maximum.
    pub fn enforce_size_limit(&self, bytes: u64) -> Result<(), FileError> {
        if bytes > self.config.max_file_size {
            return Err(FileError::TooLarge {
                limit: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Stream an upload into storage under a freshly generated name.
    ///
    /// The size limit is checked after every chunk. On any error the partial
    /// file is discarded and nothing becomes visible.
    pub async fn upload<S>(&self, original_name: &str, body: S) -> Result<StoredFile, FileError>
    where
        S: Stream<Item = Result<Bytes, FileError>> + Send,
    {
        self.validate_extension(original_name)?;
        let name = generate_storage_name(original_name);

        let mut pending = self.storage.create(&name).await?;
        let mut body = std::pin::pin!(body);

        let streamed = async {
            let mut written: u64 = 0;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                written = written.saturating_add(chunk.len() as u64);
                self.enforce_size_limit(written)?;
                pending.write_chunk(&chunk).await?;
            }
            Ok::<_, FileError>(written)
        }
        .await;

        let size = match streamed {
            Ok(size) => size,
            Err(e) => {
                pending.abort().await;
                debug!(name = %name, error = %e, "upload rejected");
                return Err(e);
            }
        };
        pending.commit().await?;

        info!(name = %name, original = %original_name, size, "file uploaded");

        Ok(StoredFile {
            url: self.config.public_url(&name),
            name,
            size,
            modified: Utc::now(),
        })
    }

    /// List stored files with an allowed extension, newest first.
    ///
    /// Scans the whole directory on every call.
    pub async fn list(&self) -> Result<Vec<StoredFile>, FileError> {
        let mut files: Vec<StoredFile> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|entry| self.is_listable(&entry.name))
            .map(|entry| self.to_stored_file(entry))
            .collect();

        files.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(files)
    }

    /// Open a stored file for reading.
    pub async fn open(&self, name: &str) -> Result<(StoredFile, FileReader), FileError> {
        let name = validate_stored_name(name)?;
        if !self.is_listable(name) {
            return Err(FileError::NotFound(name.to_string()));
        }

        match self.storage.open(name).await? {
            Some((entry, reader)) => Ok((self.to_stored_file(entry), reader)),
            None => Err(FileError::NotFound(name.to_string())),
        }
    }

    /// Delete a stored file by name.
    pub async fn delete(&self, name: &str) -> Result<(), FileError> {
        let name = validate_stored_name(name)?;
        if !self.is_listable(name) {
            return Err(FileError::NotFound(name.to_string()));
        }

        if !self.storage.delete(name).await? {
            return Err(FileError::NotFound(name.to_string()));
        }

        info!(name = %name, "file deleted");
        Ok(())
    }

    /// Whether the storage backend is reachable.
    pub async fn healthy(&self) -> bool {
        self.storage.healthy().await
    }

    /// Get the storage backend.
    pub fn storage(&self) -> &Arc<dyn FileStorage> {
        &self.storage
    }

    fn is_allowed(&self, ext: &str) -> bool {
        self.config.allowed_extensions().contains(&ext)
    }

    fn is_listable(&self, name: &str) -> bool {
        !name.starts_with('.') && self.is_allowed(&extension_of(name))
    }

    fn to_stored_file(&self, entry: StoredEntry) -> StoredFile {
        StoredFile {
            url: self.config.public_url(&entry.name),
            name: entry.name,
            size: entry.size,
            modified: entry.modified,
        }
    }
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("scheme", &self.storage.scheme())
            .finish()
    }
}

/// Generate a unique storage name: a random UUID plus the original extension.
pub fn generate_storage_name(original: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension_of(original))
}

/// Check that a caller-supplied name is a plain file name in the storage directory.
///
/// Rejects separators, NUL bytes and hidden names, which also covers `.` and
/// `..`. Interior dots such as `a..b.png` are plain file names.
pub fn validate_stored_name(name: &str) -> Result<&str, FileError> {
    let invalid = name.is_empty()
        || name.len() > 255
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(FileError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Lowercased extension with its leading dot, or an empty string.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}
