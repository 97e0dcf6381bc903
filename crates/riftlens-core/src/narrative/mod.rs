//! Content-addressed cache in front of the narrative generator.
//!
//! Entries are keyed by `(model id, system prompt, canonical input)`, so
//! logically equal inputs share an entry regardless of map ordering. The
//! store is best effort: a read or write that fails or outlasts
//! `cache_timeout_ms` is logged and the call falls through to the generator.

mod key;
mod prompt;
mod store;
mod template;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::NarrativeConfig;
use crate::error::{RiftError, RiftResult};
use crate::providers::NarrativeGenerator;

pub use key::{cache_key, canonical_json};
pub use prompt::{system_prompt, validate_output, NarrativeInput};
pub use store::{CacheRecord, CacheStore, FsCacheStore, MemoryCacheStore};
pub use template::template_narrative;

/// Upper bound on entry lifetime (ten years).
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Generated (or cached) narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub text: String,
    pub cache_hit: bool,
    /// `None` when the input could not be canonicalized and caching was skipped.
    pub cache_key: Option<String>,
}

#[derive(Clone)]
pub struct NarrativeCache {
    store: Arc<dyn CacheStore>,
    generator: Arc<dyn NarrativeGenerator>,
    ttl: ChronoDuration,
    max_chars: usize,
    store_timeout: Duration,
}

impl std::fmt::Debug for NarrativeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeCache")
            .field("ttl", &self.ttl)
            .field("max_chars", &self.max_chars)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl NarrativeCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        generator: Arc<dyn NarrativeGenerator>,
        config: &NarrativeConfig,
    ) -> Self {
        let ttl_secs = config.cache_ttl_secs.min(MAX_TTL_SECS) as i64;
        Self {
            store,
            generator,
            ttl: ChronoDuration::seconds(ttl_secs),
            max_chars: config.max_chars,
            store_timeout: config.cache_timeout(),
        }
    }

    pub fn generator(&self) -> &Arc<dyn NarrativeGenerator> {
        &self.generator
    }

    pub async fn get_or_generate(
        &self,
        model_id: &str,
        system_prompt: &str,
        input: &JsonValue,
    ) -> RiftResult<Narration> {
        let key = match cache_key(model_id, system_prompt, input) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "narrative input not cacheable; generating directly");
                None
            }
        };

        if let Some(key) = &key {
            if let Some(text) = self.lookup(key).await {
                return Ok(Narration {
                    text,
                    cache_hit: true,
                    cache_key: Some(key.clone()),
                });
            }
        }

        let raw = self.generator.generate(system_prompt, input).await?;
        let text = validate_output(&raw, self.max_chars)?;

        if let Some(key) = &key {
            let now = Utc::now();
            let record = CacheRecord {
                text: text.clone(),
                model_id: model_id.to_string(),
                created_at: now,
                expires_at: now + self.ttl,
            };
            let written = tokio::time::timeout(self.store_timeout, self.store.put(key, &record))
                .await
                .unwrap_or_else(|_| Err(self.store_timed_out("write")));
            match written {
                Ok(()) => debug!(cache_key = %key, "cached narrative"),
                Err(e) => warn!(cache_key = %key, error = %e, "narrative cache write failed"),
            }
        }

        Ok(Narration {
            text,
            cache_hit: false,
            cache_key: key,
        })
    }

    fn store_timed_out(&self, op: &str) -> RiftError {
        RiftError::cache(format!(
            "cache {op} timed out after {}ms",
            self.store_timeout.as_millis()
        ))
    }

    async fn lookup(&self, key: &str) -> Option<String> {
        let read = tokio::time::timeout(self.store_timeout, self.store.get(key))
            .await
            .unwrap_or_else(|_| Err(self.store_timed_out("read")));
        let record = match read {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "narrative cache read failed");
                return None;
            }
        };
        if record.is_expired(Utc::now()) {
            debug!(cache_key = %key, expires_at = %record.expires_at, "cache entry expired");
            return None;
        }
        match validate_output(&record.text, self.max_chars) {
            Ok(text) => {
                debug!(cache_key = %key, "narrative cache hit");
                Some(text)
            }
            Err(e) => {
                warn!(cache_key = %key, error = %e, "ignoring invalid cached narrative");
                None
            }
        }
    }
}
