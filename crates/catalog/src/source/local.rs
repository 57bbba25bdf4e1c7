use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{DescriptorSource, ObjectEntry};
use crate::error::{CatalogError, Result};

/// Descriptor files in a single local directory. Subdirectories are ignored.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    root: PathBuf,
    name: String,
}

impl LocalFileSource {
    /// Fails with `SourceUnavailable` when `root` is missing or not a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let name = root.display().to_string();
        let metadata = std::fs::metadata(&root).map_err(|e| CatalogError::unavailable(&name, e))?;
        if !metadata.is_dir() {
            return Err(CatalogError::unavailable(name, "not a directory"));
        }
        Ok(Self { root, name })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DescriptorSource for LocalFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.root.join(prefix)
        };

        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            // Follows symlinks, which is how mounted config volumes expose files
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let key = if prefix.is_empty() {
                file_name
            } else {
                format!("{}/{}", prefix.trim_end_matches('/'), file_name)
            };
            let version = metadata
                .modified()
                .ok()
                .map(|modified| format!("{}:{}", DateTime::<Utc>::from(modified).to_rfc3339(), metadata.len()));
            entries.push(ObjectEntry { key, version });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.root.join(key)).await?)
    }
}
