//! Local filesystem storage implementation.
//!
//! Every write goes to a temporary sibling first and is renamed into
//! place, so an interrupted run never leaves a truncated snapshot behind.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{OutputConfig, OutputRecord};
use crate::storage::SnapshotStorage;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    snapshot_file: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, snapshot_file: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            snapshot_file: snapshot_file.into(),
        }
    }

    /// Create a LocalStorage from the `[output]` configuration.
    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(&output.dir, &output.snapshot_file)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(AppError::validation(format!(
                "storage key must stay inside the output directory: {key:?}"
            )));
        }
        Ok(self.root_dir.join(relative))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key)?;
        self.ensure_dir(&path).await?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        self.write_bytes(key, &bytes).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn read_snapshot(&self) -> Result<Option<Vec<u8>>> {
        let bytes = self.read_bytes(&self.snapshot_file).await?;
        if bytes.is_none() {
            log::info!("No snapshot at {}, starting fresh", self.snapshot_file);
        }
        Ok(bytes)
    }

    async fn write_snapshot(&self, records: &[OutputRecord]) -> Result<()> {
        self.write_json(&self.snapshot_file, records).await?;
        log::info!(
            "Snapshot: {} records written to {}",
            records.len(),
            self.snapshot_file
        );
        Ok(())
    }

    async fn write_feed(&self, name: &str, content: &str) -> Result<()> {
        self.write_bytes(name, content.as_bytes()).await?;
        log::debug!("Feed written to {name}");
        Ok(())
    }

    async fn write_attachment(&self, key: &str, bytes: &[u8]) -> Result<String> {
        self.write_bytes(key, bytes).await?;
        log::debug!("Attachment stored at {key} ({} bytes)", bytes.len());
        Ok(key.to_string())
    }
}
