//! HTTP adapters.
//!
//! Status codes are interpreted only in [`classify`]. Adapters do not retry;
//! retry policy belongs to the orchestrator stage that calls them.

mod delivery;
mod narrative;
mod telemetry;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Response, StatusCode};

use crate::error::{RiftError, RiftResult};

pub use delivery::HttpDeliveryClient;
pub use narrative::ChatCompletionsGenerator;
pub use telemetry::HttpTelemetryClient;

const USER_AGENT_VALUE: &str = concat!("riftlens/", env!("CARGO_PKG_VERSION"));

/// Client-side ceiling; stage timeouts are usually tighter.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn build_client() -> RiftResult<reqwest::Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .default_headers(default_headers)
        .build()
        .map_err(|e| RiftError::network(format!("failed to create HTTP client: {e}")))
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Map a response onto the error taxonomy. `resource` names what was asked
/// for in `NotFound` errors.
pub(crate) async fn classify(response: Response, resource: &str) -> RiftResult<Response> {
    let status = response.status();
    match status.as_u16() {
        200..=299 => Ok(response),

        404 => Err(RiftError::not_found(resource)),

        429 => Err(RiftError::RateLimited {
            retry_after: retry_after(&response),
        }),

        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RiftError::network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                summarize(&body, status)
            )))
        }
    }
}

/// `Retry-After` in whole seconds. HTTP-date values are not honoured.
pub(crate) fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn summarize(body: &str, status: StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
    }
    trimmed.chars().take(200).collect()
}
