use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage endpoint is not configured")]
    NotConfigured,

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Remote object-storage collaborator: accepts a byte buffer, returns a
/// durable URL. Callers attach the URL to a profile only after `put` has
/// confirmed the upload.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, data: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// HTTP implementation posting buffers to an ingest endpoint that responds
/// with `{"url": "..."}`.
pub struct HttpStorage {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpStorage {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config.endpoint.clone().ok_or(StorageError::NotConfigured)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ObjectStorage for HttpStorage {
    async fn put(&self, data: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", content_type)
            .body(data);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::Upload(format!(
                "storage endpoint returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;
        Ok(body.url)
    }
}

/// In-memory storage for tests and DATABASE_URL-less local runs. Hands back
/// stable fake URLs without touching the network.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<Vec<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, data: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        self.objects.write().await.push(data);
        Ok(format!("https://storage.invalid/avatars/{}", Uuid::new_v4()))
    }
}
