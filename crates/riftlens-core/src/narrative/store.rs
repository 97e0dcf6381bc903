//! Narrative cache stores.
//!
//! ```text
//! {cache_dir}/
//!   {key}.json    # CacheRecord
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RiftError, RiftResult};

/// One cached narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub text: String,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Key-value backend for [`super::NarrativeCache`]. Errors are reported but
/// the cache treats them as misses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> RiftResult<Option<CacheRecord>>;
    async fn put(&self, key: &str, record: &CacheRecord) -> RiftResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> RiftResult<Option<CacheRecord>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, record: &CacheRecord) -> RiftResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }
}

/// One JSON file per key.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    cache_dir: PathBuf,
}

impl FsCacheStore {
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn record_path(&self, key: &str) -> RiftResult<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RiftError::cache(format!("invalid cache key: {key:?}")));
        }
        Ok(self.cache_dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, key: &str) -> RiftResult<Option<CacheRecord>> {
        let path = self.record_path(key)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "narrative not in cache");
                return Ok(None);
            }
            Err(e) => {
                return Err(RiftError::cache(format!(
                    "failed to read cache record: {e}"
                )))
            }
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| RiftError::cache(format!("failed to parse cache record: {e}")))?;
        Ok(Some(record))
    }

    async fn put(&self, key: &str, record: &CacheRecord) -> RiftResult<()> {
        let path = self.record_path(key)?;
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| RiftError::cache(format!("failed to create cache directory: {e}")))?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| RiftError::cache(format!("failed to serialize cache record: {e}")))?;
        write_atomic(&path, &json).await
    }
}

async fn write_atomic(path: &Path, content: &str) -> RiftResult<()> {
    let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

    fs::write(&temp_path, content)
        .await
        .map_err(|e| RiftError::cache(format!("failed to write temp file: {e}")))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(RiftError::cache(format!("failed to rename temp file: {e}")));
    }
    Ok(())
}
