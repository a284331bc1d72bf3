//! HTTP-backed content store
//!
//! Talks to the Drive-like file service that hosts the study stimuli. Blob
//! refs are the file ids the service hands out in folder listings. Transport
//! failures map to `Error::Store` so the retry-once policy in
//! `download_blob_with_retry` applies.

use async_trait::async_trait;
use listenlab_common::{Error, Result};
use serde::Deserialize;

use super::{BlobRef, ContentStore};

const USER_AGENT: &str = concat!("listenlab/", env!("CARGO_PKG_VERSION"));

/// One entry in a folder listing response
#[derive(Debug, Deserialize)]
struct FileEntry {
    name: String,
    id: String,
}

/// Content store backed by a remote file service
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Store(format!("GET {}: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => Ok(response
                .bytes()
                .await
                .map_err(|e| Error::Store(format!("GET {}: body read: {}", url, e)))?
                .to_vec()),
            reqwest::StatusCode::NOT_FOUND => Err(Error::NotFound(url.to_string())),
            status => Err(Error::Store(format!("GET {}: HTTP {}", url, status))),
        }
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn list_audio_files(&self, folder_key: &str) -> Result<Vec<(String, BlobRef)>> {
        let url = format!("{}/folders/{}/files", self.base_url, folder_key);
        let bytes = self.get_bytes(&url).await?;
        let entries: Vec<FileEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Store(format!("GET {}: invalid listing: {}", url, e)))?;
        Ok(entries.into_iter().map(|e| (e.name, e.id)).collect())
    }

    async fn download_blob(&self, blob_ref: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}/content", self.base_url, blob_ref);
        self.get_bytes(&url).await
    }

    async fn download_metadata_csv(&self, file_ref: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}/content", self.base_url, file_ref);
        self.get_bytes(&url).await
    }
}
