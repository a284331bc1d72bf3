//! Content store access
//!
//! The content store holds the audio stimuli and their metadata CSVs. The
//! service only needs three operations: list a folder, fetch one blob, fetch
//! one metadata file. Blob downloads are retried once on transient failure;
//! metadata and listing calls surface failures directly since they only run
//! at startup where a failure is fatal anyway.

use async_trait::async_trait;
use listenlab_common::{Error, Result};
use tracing::warn;

pub mod catalog;
pub mod http;
pub mod local;

pub use catalog::{ContentCatalog, Item, ItemKind, Pool};
pub use http::HttpContentStore;
pub use local::LocalContentStore;

/// Opaque reference to one audio blob within a content store
pub type BlobRef = String;

/// Read-only access to audio stimuli and their metadata
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List audio files under one folder key as (filename, blob ref) pairs
    async fn list_audio_files(&self, folder_key: &str) -> Result<Vec<(String, BlobRef)>>;

    /// Download one audio blob
    async fn download_blob(&self, blob_ref: &str) -> Result<Vec<u8>>;

    /// Download one metadata CSV
    async fn download_metadata_csv(&self, file_ref: &str) -> Result<Vec<u8>>;
}

/// Download a blob, retrying once on a transient store failure.
///
/// Only `Error::Store` is treated as transient; anything else (missing blob,
/// I/O on a local store) surfaces immediately.
pub async fn download_blob_with_retry(
    store: &dyn ContentStore,
    blob_ref: &str,
) -> Result<Vec<u8>> {
    match store.download_blob(blob_ref).await {
        Ok(bytes) => Ok(bytes),
        Err(Error::Store(msg)) => {
            warn!("Blob download failed for {}, retrying once: {}", blob_ref, msg);
            store.download_blob(blob_ref).await
        }
        Err(e) => Err(e),
    }
}
