use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::error::AppError;

/// Blob storage for uploaded documents. Sections only keep the opaque handle.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the handle to persist.
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError>;

    /// Public URL for a previously returned handle.
    fn resolve(&self, handle: &str) -> String;
}

pub struct HttpBlobStore {
    client: Client,
    upload_base: String,
    public_base: String,
}

impl HttpBlobStore {
    pub fn new(upload_base: impl Into<String>, public_base: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            upload_base: upload_base.into(),
            public_base: public_base.into(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let url = format!("{}/{}", self.upload_base, key);
        let size = bytes.len();
        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("blob upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("blob store error {}: {}", status, body)));
        }

        info!("uploaded {} bytes to {}", size, key);
        Ok(key.to_string())
    }

    fn resolve(&self, handle: &str) -> String {
        format!("{}/{}", self.public_base, handle)
    }
}

/// Keeps blobs in process memory.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: &str) -> Option<(String, Vec<u8>)> {
        self.blobs
            .lock()
            .ok()
            .and_then(|blobs| blobs.get(handle).cloned())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| AppError::Internal("blob store lock poisoned".to_string()))?;
        blobs.insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(key.to_string())
    }

    fn resolve(&self, handle: &str) -> String {
        format!("memory://{}", handle)
    }
}
