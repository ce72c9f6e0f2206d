//! File storage backends.
//!
//! Provides the trait the upload pipeline writes through and the local
//! directory implementation. Uploads are staged in a hidden temporary file and
//! renamed into place on commit, so a partially written file is never visible
//! under its final name.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};

/// Boxed reader over a stored file's bytes.
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Metadata for one stored entry, as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// An in-flight write. Nothing is visible to readers until [`commit`] succeeds.
///
/// Dropping an uncommitted write discards it.
///
/// [`commit`]: PendingWrite::commit
#[async_trait]
pub trait PendingWrite: Send {
    /// Append a chunk of data.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Make the written data visible under its final name.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard everything written so far.
    async fn abort(self: Box<Self>);
}

/// File storage backend trait.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Make sure the backend can accept writes (e.g. create the directory).
    async fn prepare(&self) -> Result<()>;

    /// Start writing a new file under `name`.
    async fn create(&self, name: &str) -> Result<Box<dyn PendingWrite>>;

    /// List every stored file. Non-recursive.
    async fn list(&self) -> Result<Vec<StoredEntry>>;

    /// Open a stored file for reading. `None` if it does not exist.
    async fn open(&self, name: &str) -> Result<Option<(StoredEntry, FileReader)>>;

    /// Delete a stored file. Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Whether the backend is currently reachable.
    async fn healthy(&self) -> bool;

    /// Get the storage scheme (e.g., "local").
    fn scheme(&self) -> &'static str;
}

/// Local filesystem storage rooted at a single flat directory.
pub struct LocalFileStorage {
    /// Directory holding stored files.
    base_path: PathBuf,
}

impl LocalFileStorage {
    /// Create a new local file storage.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding stored files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a bare file name inside the storage directory.
    ///
    /// Rejects anything that is not exactly one normal path component.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => bail!("file name must be a single path component: {name:?}"),
        }
        if name.contains(['/', '\\', '\0']) {
            bail!("file name contains a path separator: {name:?}");
        }
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .with_context(|| format!("failed to create {}", self.base_path.display()))?;
        debug!(path = ?self.base_path, "storage directory ready");
        Ok(())
    }

    async fn create(&self, name: &str) -> Result<Box<dyn PendingWrite>> {
        let final_path = self.resolve(name)?;
        let temp_path = self.resolve(&format!(".{name}.part"))?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
            .context("failed to create file")?;

        Ok(Box::new(LocalPendingWrite {
            file: Some(file),
            temp_path,
            final_path,
            finished: false,
        }))
    }

    async fn list(&self) -> Result<Vec<StoredEntry>> {
        let mut dir = fs::read_dir(&self.base_path)
            .await
            .context("failed to read storage directory")?;
        let mut entries = Vec::new();

        while let Some(entry) = dir
            .next_entry()
            .await
            .context("failed to read storage directory entry")?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            // The entry may have been deleted since read_dir saw it.
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).context("failed to stat stored file"),
            };
            if !metadata.is_file() {
                continue;
            }

            entries.push(StoredEntry {
                name,
                size: metadata.len(),
                modified: modified_time(&metadata),
            });
        }

        Ok(entries)
    }

    async fn open(&self, name: &str) -> Result<Option<(StoredEntry, FileReader)>> {
        let path = self.resolve(name)?;

        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("failed to open file"),
        };
        let metadata = file.metadata().await.context("failed to stat file")?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let entry = StoredEntry {
            name: name.to_string(),
            size: metadata.len(),
            modified: modified_time(&metadata),
        };
        let reader: FileReader = Box::new(file);
        Ok(Some((entry, reader)))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.resolve(name)?;

        // Directories never show up in listings, so they do not exist here either.
        match fs::metadata(&path).await {
            Ok(m) if m.is_file() => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e).context("failed to stat file"),
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name = %name, "file deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("failed to delete file"),
        }
    }

    async fn healthy(&self) -> bool {
        match fs::read_dir(&self.base_path).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, path = ?self.base_path, "storage directory unreadable");
                false
            }
        }
    }

    fn scheme(&self) -> &'static str {
        "local"
    }
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("base_path", &self.base_path)
            .finish()
    }
}

fn modified_time(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .into()
}

/// Upload staged in `.<name>.part` next to its final location.
struct LocalPendingWrite {
    file: Option<fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    finished: bool,
}

#[async_trait]
impl PendingWrite for LocalPendingWrite {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .context("write after the file was closed")?;
        file.write_all(chunk).await.context("failed to write file")?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let mut file = self.file.take().context("file already closed")?;
        file.flush().await.context("failed to flush file")?;
        file.sync_all().await.context("failed to sync file")?;
        drop(file);

        fs::rename(&self.temp_path, &self.final_path)
            .await
            .context("failed to move file into place")?;
        self.finished = true;

        debug!(path = ?self.final_path, "file written");
        Ok(())
    }

    async fn abort(mut self: Box<Self>) {
        drop(self.file.take());
        match fs::remove_file(&self.temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = ?self.temp_path, "failed to remove partial upload"),
        }
        self.finished = true;
        debug!(path = ?self.temp_path, "partial upload discarded");
    }
}

impl Drop for LocalPendingWrite {
    fn drop(&mut self) {
        // Reached when the upload future is cancelled mid-stream. Drop cannot
        // await, so this is a single blocking unlink on purpose.
        if !self.finished {
            drop(self.file.take());
            match std::fs::remove_file(&self.temp_path) {
                Ok(()) => debug!(path = ?self.temp_path, "abandoned upload removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(error = %e, path = ?self.temp_path, "failed to remove abandoned upload");
                }
            }
        }
    }
}
