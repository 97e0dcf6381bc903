//! Delivery step: patch the original message, fall back to one new post.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{RiftError, RiftResult};
use crate::providers::{DeliveryClient, DeliveryPayload};

use super::result::{DeliveryOutcome, DeliveryTarget};

pub(crate) struct DeliveryStep<'a> {
    pub(crate) client: &'a dyn DeliveryClient,
    pub(crate) timeout: Duration,
    pub(crate) token_ttl: Duration,
}

/// Outcome plus the patch failure that sent us down the fallback path.
#[derive(Debug)]
pub(crate) struct DeliveryReport {
    pub(crate) outcome: DeliveryOutcome,
    pub(crate) patch_error: Option<RiftError>,
    pub(crate) calls: u32,
}

impl DeliveryStep<'_> {
    /// At most one patch and one post. A previous run that already posted
    /// the fallback suppresses another post.
    pub(crate) async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: &DeliveryPayload,
        previous: Option<&DeliveryOutcome>,
    ) -> DeliveryReport {
        let mut calls = 0;

        let age = target.token_age(Utc::now());
        let patch_error = if age > self.token_ttl {
            RiftError::DeliveryExpired {
                message: format!(
                    "interaction token is {}s old (limit {}s)",
                    age.as_secs(),
                    self.token_ttl.as_secs()
                ),
            }
        } else {
            calls += 1;
            let patched = self
                .bounded(
                    "patch_original_message",
                    self.client.patch_original_message(
                        &target.application_id,
                        &target.interaction_token,
                        payload,
                    ),
                )
                .await;
            match patched {
                Ok(()) => {
                    info!(match_id = %payload.match_id, "patched original message");
                    return DeliveryReport {
                        outcome: DeliveryOutcome::Patched,
                        patch_error: None,
                        calls,
                    };
                }
                Err(e) => e,
            }
        };

        warn!(
            match_id = %payload.match_id,
            error = %patch_error,
            kind = patch_error.kind(),
            "original message not patched; trying channel post"
        );

        if matches!(
            previous,
            Some(DeliveryOutcome::FallbackPosted | DeliveryOutcome::Suppressed)
        ) {
            info!(match_id = %payload.match_id, "fallback already posted by an earlier run");
            return DeliveryReport {
                outcome: DeliveryOutcome::Suppressed,
                patch_error: Some(patch_error),
                calls,
            };
        }

        calls += 1;
        let posted = self
            .bounded(
                "post_new_message",
                self.client.post_new_message(&target.channel_id, payload),
            )
            .await;
        let outcome = match posted {
            Ok(()) => DeliveryOutcome::FallbackPosted,
            Err(e) => {
                warn!(match_id = %payload.match_id, error = %e, "fallback post failed");
                DeliveryOutcome::Failed {
                    reason: format!("patch: {patch_error}; post: {e}"),
                }
            }
        };
        DeliveryReport {
            outcome,
            patch_error: Some(patch_error),
            calls,
        }
    }

    async fn bounded<F>(&self, operation: &str, call: F) -> RiftResult<()>
    where
        F: std::future::Future<Output = RiftResult<()>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(RiftError::timeout(operation, self.timeout)))
    }
}
