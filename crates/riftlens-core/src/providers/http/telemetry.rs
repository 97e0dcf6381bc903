use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RiftError, RiftResult};
use crate::providers::TelemetryClient;
use crate::timeline::{MatchDetails, MatchTimeline};

use super::{build_client, classify, normalize_base_url};

/// Header carrying the telemetry API key.
const API_KEY_HEADER: &str = "X-Riot-Token";

/// `GET {base}/matches/{id}` and `GET {base}/matches/{id}/timeline`.
#[derive(Debug, Clone)]
pub struct HttpTelemetryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTelemetryClient {
    pub fn new(base_url: &str) -> RiftResult<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base_url(base_url),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, resource: &str) -> RiftResult<T> {
        debug!(url = %url, "fetching telemetry");
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = classify(request.send().await?, resource).await?;
        let body = response
            .text()
            .await
            .map_err(|e| RiftError::network(format!("failed to read response body: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TelemetryClient for HttpTelemetryClient {
    async fn get_timeline(&self, match_id: &str) -> RiftResult<MatchTimeline> {
        let url = format!("{}/matches/{}/timeline", self.base_url, match_id);
        self.get_json(&url, &format!("timeline for {match_id}")).await
    }

    async fn get_match_details(&self, match_id: &str) -> RiftResult<MatchDetails> {
        let url = format!("{}/matches/{}", self.base_url, match_id);
        self.get_json(&url, &format!("match {match_id}")).await
    }
}
