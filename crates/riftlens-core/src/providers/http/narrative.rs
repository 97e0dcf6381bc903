use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::{RiftError, RiftResult};
use crate::providers::NarrativeGenerator;

use super::{build_client, classify, normalize_base_url};

/// OpenAI-compatible `POST {base}/chat/completions` narrator.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsGenerator {
    pub fn new(base_url: &str, model: impl Into<String>) -> RiftResult<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base_url(base_url),
            model: model.into(),
            api_key: None,
            temperature: 0.4,
            max_tokens: 300,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl NarrativeGenerator for ChatCompletionsGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system_prompt: &str, input: &JsonValue) -> RiftResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": input.to_string() },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!(model = %self.model, "requesting narrative");
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        let response = classify(request.send().await?, "chat completions endpoint").await?;
        let json: JsonValue = response.json().await?;

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .ok_or_else(|| RiftError::validation("chat completion response missing content"))
    }
}
