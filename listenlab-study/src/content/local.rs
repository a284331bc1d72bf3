//! Filesystem-backed content store
//!
//! Serves stimuli from a directory tree under the root folder. Blob refs are
//! paths relative to the content root. Used for development and tests; the
//! deployed study points at the remote store instead.

use async_trait::async_trait;
use listenlab_common::{Error, Result};
use std::path::{Path, PathBuf};

use super::{BlobRef, ContentStore};

/// Content store reading from a local directory
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative ref, rejecting anything that escapes the root
    fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute()
            || rel_path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::Validation(format!("invalid content ref: {}", rel)));
        }
        Ok(self.root.join(rel_path))
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn list_audio_files(&self, folder_key: &str) -> Result<Vec<(String, BlobRef)>> {
        let folder = self.resolve(folder_key)?;
        if !folder.is_dir() {
            return Err(Error::Config(format!(
                "content folder not found: {}",
                folder.display()
            )));
        }

        // Walk the folder tree; filenames are unique within one folder key
        let mut files = Vec::new();
        let mut pending = vec![folder];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    let rel = path
                        .strip_prefix(&self.root)
                        .map_err(|_| Error::Internal("listing escaped content root".to_string()))?;
                    files.push((name.to_string(), rel.to_string_lossy().replace('\\', "/")));
                }
            }
        }
        files.sort();
        Ok(files)
    }

    async fn download_blob(&self, blob_ref: &str) -> Result<Vec<u8>> {
        let path = self.resolve(blob_ref)?;
        if !path.is_file() {
            return Err(Error::NotFound(format!("blob {}", blob_ref)));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn download_metadata_csv(&self, file_ref: &str) -> Result<Vec<u8>> {
        let path = self.resolve(file_ref)?;
        if !path.is_file() {
            return Err(Error::Config(format!(
                "metadata file not found: {}",
                path.display()
            )));
        }
        Ok(tokio::fs::read(path).await?)
    }
}
