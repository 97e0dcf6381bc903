//! Contracts for the external collaborators the pipeline consumes, plus
//! HTTP and fixture implementations.

mod fixture;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::RiftResult;
use crate::timeline::{MatchDetails, MatchTimeline};

pub use fixture::FixtureTelemetryClient;
pub use http::{ChatCompletionsGenerator, HttpDeliveryClient, HttpTelemetryClient};

/// Match telemetry source. Errors classify as `RateLimited`, `NotFound`
/// or `TransientNetwork`.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    async fn get_timeline(&self, match_id: &str) -> RiftResult<MatchTimeline>;
    async fn get_match_details(&self, match_id: &str) -> RiftResult<MatchDetails>;
}

/// Language-model narration. May time out or return malformed output.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn model_id(&self) -> &str;
    async fn generate(&self, system_prompt: &str, input: &JsonValue) -> RiftResult<String>;
}

/// Text-to-speech. `Ok(None)` means the synthesizer declined.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, tone: ToneTag) -> RiftResult<Option<String>>;
}

/// Notification channel.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Edit the message that acknowledged the request. Tokens expire.
    async fn patch_original_message(
        &self,
        application_id: &str,
        token: &str,
        payload: &DeliveryPayload,
    ) -> RiftResult<()>;

    async fn post_new_message(&self, channel_id: &str, payload: &DeliveryPayload) -> RiftResult<()>;
}

/// Delivery voice hint derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneTag {
    Hype,
    Upbeat,
    Steady,
    Encouraging,
}

impl ToneTag {
    pub fn from_overall(score: f64) -> Self {
        if score >= 75.0 {
            ToneTag::Hype
        } else if score >= 55.0 {
            ToneTag::Upbeat
        } else if score >= 40.0 {
            ToneTag::Steady
        } else {
            ToneTag::Encouraging
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToneTag::Hype => "hype",
            ToneTag::Upbeat => "upbeat",
            ToneTag::Steady => "steady",
            ToneTag::Encouraging => "encouraging",
        }
    }
}

/// What gets delivered. Rendering into embeds is the channel's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub match_id: String,
    pub content: String,
    pub overall_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}
