use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use tracing::debug;

use crate::error::{RiftError, RiftResult};
use crate::providers::{DeliveryClient, DeliveryPayload};

use super::{build_client, classify, normalize_base_url};

/// Chat-platform delivery over its REST API.
///
/// Patching uses the interaction webhook (no bot auth, token in the path);
/// the fallback post needs a bot token.
#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
    base_url: String,
    bot_token: Option<String>,
}

impl HttpDeliveryClient {
    pub fn new(base_url: &str) -> RiftResult<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base_url(base_url),
            bot_token: None,
        })
    }

    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }
}

fn message_body(payload: &DeliveryPayload) -> serde_json::Value {
    let mut content = payload.content.clone();
    if let Some(url) = &payload.audio_url {
        content.push('\n');
        content.push_str(url);
    }
    json!({ "content": content })
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn patch_original_message(
        &self,
        application_id: &str,
        token: &str,
        payload: &DeliveryPayload,
    ) -> RiftResult<()> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.base_url, application_id, token
        );
        debug!(match_id = %payload.match_id, "patching original message");
        let response = self
            .client
            .patch(&url)
            .json(&message_body(payload))
            .send()
            .await?;

        // Expired or revoked interaction tokens surface as 401/403/404.
        match response.status().as_u16() {
            401 | 403 | 404 => Err(RiftError::DeliveryExpired {
                message: format!("interaction token rejected (HTTP {})", response.status().as_u16()),
            }),
            _ => classify(response, "original message").await.map(|_| ()),
        }
    }

    async fn post_new_message(&self, channel_id: &str, payload: &DeliveryPayload) -> RiftResult<()> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        debug!(match_id = %payload.match_id, channel_id, "posting new message");
        let mut request = self.client.post(&url).json(&message_body(payload));
        if let Some(token) = &self.bot_token {
            request = request.header(AUTHORIZATION, format!("Bot {token}"));
        }
        classify(request.send().await?, &format!("channel {channel_id}"))
            .await
            .map(|_| ())
    }
}
