//! In-memory media uploader
//!
//! Keeps uploaded bytes in process and hands out URLs under a configurable
//! base. With the `demo` feature the router serves them back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{MediaError, MediaUpload, MediaUploader};

/// Stored upload
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct MemoryUploader {
    base_url: String,
    files: RwLock<HashMap<String, StoredMedia>>,
    uploads: RwLock<Vec<String>>,
    reject_with: RwLock<Option<String>>,
    offline: AtomicBool,
}

impl Default for MemoryUploader {
    fn default() -> Self {
        Self::new("https://media.invalid")
    }
}

impl MemoryUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files: RwLock::new(HashMap::new()),
            uploads: RwLock::new(Vec::new()),
            reject_with: RwLock::new(None),
            offline: AtomicBool::new(false),
        }
    }

    /// Make the next uploads fail the way the CDN reports a refused file
    pub async fn reject_with(&self, message: Option<&str>) {
        *self.reject_with.write().await = message.map(str::to_string);
    }

    /// Simulate the CDN being unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Filenames received so far, oldest first
    pub async fn uploads(&self) -> Vec<String> {
        self.uploads.read().await.clone()
    }

    pub async fn get(&self, key: &str) -> Option<StoredMedia> {
        self.files.read().await.get(key).cloned()
    }
}

#[async_trait]
impl MediaUploader for MemoryUploader {
    async fn upload(&self, file: MediaUpload) -> Result<String, MediaError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MediaError::Transport("connection refused".to_string()));
        }
        if let Some(message) = self.reject_with.read().await.clone() {
            return Err(MediaError::Rejected(message));
        }

        let extension = file
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());
        let key = format!("{}.{}", uuid::Uuid::new_v4().simple(), extension);

        self.uploads.write().await.push(file.filename);
        self.files.write().await.insert(
            key.clone(),
            StoredMedia {
                content_type: file.content_type,
                bytes: file.bytes,
            },
        );
        Ok(format!("{}/{}", self.base_url, key))
    }
}
