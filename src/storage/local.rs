//! Local filesystem storage implementation.
//!
//! Keys map onto paths below a root directory:
//!
//! ```text
//! {root}/
//! ├── archive/                          # Source lists (read-only here)
//! │   └── {provider}/
//! │       ├── {provider}_{YYYYMMDD}.csv
//! │       └── parts/{provider}_{YYYYMMDD}_parts.csv
//! ├── generated_lists/{id}.csv
//! └── generated_lists_zip/
//!     ├── tranco_{id}-1m.csv.zip
//!     └── top-1m.csv.zip
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::io::BufReader;

use crate::error_handling::StorageError;
use crate::storage::{LineReader, Storage};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }
        Ok(())
    }

    /// Creates a uniquely named staging file next to `path`.
    ///
    /// Concurrent writers of the same key each get their own staging file, so the
    /// final rename is the only step they share. The file is removed if it is
    /// dropped before being persisted.
    async fn staging_file(&self, key: &str, path: &Path) -> Result<TempPath, StorageError> {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root_dir.clone());
        let staged = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(".staging-")
                .tempfile_in(dir)
        })
        .await
        .map_err(|e| StorageError::io(key, std::io::Error::other(e)))?
        .map_err(|e| StorageError::io(key, e))?;
        Ok(staged.into_temp_path())
    }

    fn persist(key: &str, staged: TempPath, target: &Path) -> Result<(), StorageError> {
        staged
            .persist(target)
            .map_err(|e| StorageError::io(key, e.error))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        tokio::fs::try_exists(self.path(key))
            .await
            .map_err(|e| StorageError::io(key, e))
    }

    async fn open(&self, key: &str) -> Result<LineReader, StorageError> {
        let file = tokio::fs::File::open(self.path(key))
            .await
            .map_err(|e| StorageError::io(key, e))?;
        Ok(Box::pin(BufReader::new(file)))
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(self.path(key))
            .await
            .map_err(|e| StorageError::io(key, e))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path(key);
        self.ensure_dir(key, &path).await?;

        let staged = self.staging_file(key, &path).await?;
        tokio::fs::write(&staged, &bytes)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        Self::persist(key, staged, &path)
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let target = self.path(to);
        self.ensure_dir(to, &target).await?;

        let staged = self.staging_file(to, &target).await?;
        tokio::fs::copy(self.path(from), &staged)
            .await
            .map_err(|e| StorageError::io(from, e))?;
        Self::persist(to, staged, &target)
    }

    fn describe(&self, key: &str) -> String {
        self.path(key).display().to_string()
    }
}
