//! Pipeline configuration.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RIFTLENS_FETCH_TIMEOUT_MS` | Per-call telemetry timeout |
//! | `RIFTLENS_NARRATE_TIMEOUT_MS` | Per-call narrative generator timeout |
//! | `RIFTLENS_MAX_ATTEMPTS` | Fetch/persist attempts for transient failures |
//! | `RIFTLENS_MODEL_ID` | Narrative model id |
//! | `RIFTLENS_CACHE_TTL_SECS` | Narrative cache TTL |
//! | `RIFTLENS_CACHE_TIMEOUT_MS` | Narrative cache store call bound |
//! | `RIFTLENS_TOKEN_TTL_SECS` | Interaction token validity window |
//! | `RIFTLENS_BANNED_PHRASES` | Comma separated guardrail phrase list |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RiftError, RiftResult};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,

    #[serde(default)]
    pub guardrail: GuardrailConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Per-call timeouts in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_fetch_ms")]
    pub fetch_ms: u64,
    #[serde(default = "default_persist_ms")]
    pub persist_ms: u64,
    #[serde(default = "default_narrate_ms")]
    pub narrate_ms: u64,
    #[serde(default = "default_synthesize_ms")]
    pub synthesize_ms: u64,
    #[serde(default = "default_deliver_ms")]
    pub deliver_ms: u64,
}

fn default_fetch_ms() -> u64 {
    10_000
}

fn default_persist_ms() -> u64 {
    5_000
}

fn default_narrate_ms() -> u64 {
    30_000
}

fn default_synthesize_ms() -> u64 {
    20_000
}

fn default_deliver_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fetch_ms: default_fetch_ms(),
            persist_ms: default_persist_ms(),
            narrate_ms: default_narrate_ms(),
            synthesize_ms: default_synthesize_ms(),
            deliver_ms: default_deliver_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn persist(&self) -> Duration {
        Duration::from_millis(self.persist_ms)
    }

    pub fn narrate(&self) -> Duration {
        Duration::from_millis(self.narrate_ms)
    }

    pub fn synthesize(&self) -> Duration {
        Duration::from_millis(self.synthesize_ms)
    }

    pub fn deliver(&self) -> Duration {
        Duration::from_millis(self.deliver_ms)
    }
}

/// Retry policy for fetch and persist stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Rate-limit waits longer than this fail the stage instead of sleeping.
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_max_retry_after_secs() -> u64 {
    120
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

/// Narrative generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Bumping this invalidates every cached narrative.
    #[serde(default = "default_prompt_version")]
    pub prompt_version: String,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Generator attempts before falling back to the template.
    #[serde(default = "default_narrative_attempts")]
    pub attempts: u32,

    #[serde(default = "default_narrative_max_chars")]
    pub max_chars: usize,

    /// Bound on each cache store read or write. An elapsed call is a miss.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,
}

fn default_model_id() -> String {
    "gpt-4o-mini".to_string()
}

fn default_prompt_version() -> String {
    "v1".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_narrative_attempts() -> u32 {
    2
}

fn default_narrative_max_chars() -> usize {
    4_000
}

fn default_cache_timeout_ms() -> u64 {
    500
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            prompt_version: default_prompt_version(),
            cache_ttl_secs: default_cache_ttl_secs(),
            attempts: default_narrative_attempts(),
            max_chars: default_narrative_max_chars(),
            cache_timeout_ms: default_cache_timeout_ms(),
        }
    }
}

impl NarrativeConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

/// Speech text guardrail settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,

    /// Ungrounded claims removed from speech text (case-insensitive).
    #[serde(default = "default_banned_phrases")]
    pub banned_phrases: Vec<String>,
}

fn default_min_chars() -> usize {
    60
}

fn default_max_chars() -> usize {
    220
}

fn default_max_sentences() -> usize {
    3
}

/// Crowd-control claims are never backed by the fact ledger.
pub fn default_banned_phrases() -> Vec<String> {
    [
        "crowd control",
        "hard cc",
        "perma-cc",
        "locked down",
        "stunned",
        "stuns",
        "stun",
        "rooted",
        "roots",
        "knocked up",
        "knock-up",
        "knockup",
        "taunted",
        "feared",
        "charmed",
        "silenced",
        "suppressed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
            max_sentences: default_max_sentences(),
            banned_phrases: default_banned_phrases(),
        }
    }
}

/// Delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Interaction tokens older than this are not used for patching.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl_secs() -> u64 {
    15 * 60
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl DeliveryConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

impl PipelineConfig {
    /// Defaults with `RIFTLENS_*` overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn from_yaml_str(raw: &str) -> RiftResult<Self> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| RiftError::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> RiftResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RiftError::config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Overlay environment variables onto the current values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("RIFTLENS_FETCH_TIMEOUT_MS") {
            self.timeouts.fetch_ms = v;
        }
        if let Some(v) = env_parse("RIFTLENS_NARRATE_TIMEOUT_MS") {
            self.timeouts.narrate_ms = v;
        }
        if let Some(v) = env_parse("RIFTLENS_MAX_ATTEMPTS") {
            self.retry.max_attempts = v;
        }
        if let Ok(v) = std::env::var("RIFTLENS_MODEL_ID") {
            if !v.trim().is_empty() {
                self.narrative.model_id = v.trim().to_string();
            }
        }
        if let Some(v) = env_parse("RIFTLENS_CACHE_TTL_SECS") {
            self.narrative.cache_ttl_secs = v;
        }
        if let Some(v) = env_parse("RIFTLENS_CACHE_TIMEOUT_MS") {
            self.narrative.cache_timeout_ms = v;
        }
        if let Some(v) = env_parse("RIFTLENS_TOKEN_TTL_SECS") {
            self.delivery.token_ttl_secs = v;
        }
        if let Ok(v) = std::env::var("RIFTLENS_BANNED_PHRASES") {
            let phrases: Vec<String> = v
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            if !phrases.is_empty() {
                self.guardrail.banned_phrases = phrases;
            }
        }
    }

    pub fn validate(&self) -> RiftResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(RiftError::config("retry.max_attempts must be at least 1"));
        }
        if self.narrative.attempts == 0 {
            return Err(RiftError::config("narrative.attempts must be at least 1"));
        }
        if self.narrative.cache_timeout_ms == 0 {
            return Err(RiftError::config(
                "narrative.cache_timeout_ms must be at least 1",
            ));
        }
        if self.guardrail.max_sentences == 0 {
            return Err(RiftError::config(
                "guardrail.max_sentences must be at least 1",
            ));
        }
        if self.guardrail.min_chars > self.guardrail.max_chars {
            return Err(RiftError::config(format!(
                "guardrail.min_chars ({}) exceeds guardrail.max_chars ({})",
                self.guardrail.min_chars, self.guardrail.max_chars
            )));
        }
        Ok(())
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.narrative.model_id = model_id.into();
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
