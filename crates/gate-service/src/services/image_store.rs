//! Object storage for uploaded meal images.

use crate::errors::GateError;
use async_trait::async_trait;
use axum::body::Bytes;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// A stored image object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub content_type: String,
    pub bytes: Bytes,
    /// Subject that uploaded the object.
    pub uploaded_by: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `image` under `path` in `bucket`, replacing any existing object.
    async fn put(&self, bucket: &str, path: &str, image: StoredImage) -> Result<(), GateError>;

    async fn get(&self, bucket: &str, path: &str) -> Result<Option<StoredImage>, GateError>;

    /// Object paths in `bucket`, sorted.
    async fn list(&self, bucket: &str) -> Result<Vec<String>, GateError>;
}

/// In-process image store, keyed by `(bucket, path)`.
#[derive(Default)]
pub struct InMemoryImageStore {
    objects: RwLock<BTreeMap<(String, String), StoredImage>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn put(&self, bucket: &str, path: &str, image: StoredImage) -> Result<(), GateError> {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), path.to_string()), image);
        Ok(())
    }

    async fn get(&self, bucket: &str, path: &str) -> Result<Option<StoredImage>, GateError> {
        Ok(self
            .objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned())
    }

    async fn list(&self, bucket: &str) -> Result<Vec<String>, GateError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, path)| path.clone())
            .collect())
    }
}
