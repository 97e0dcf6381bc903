//! Stage-boundary retry with bounded attempts.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{RiftError, RiftResult};

#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    max_retry_after: Duration,
}

impl RetryPolicy {
    pub(crate) fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms.max(config.base_backoff_ms)),
            max_retry_after: Duration::from_secs(config.max_retry_after_secs),
        }
    }

    /// Upper bound of the full-jitter window for the n-th retry (1-based).
    fn backoff_ceiling(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    fn jittered_backoff(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_ceiling(retry).as_millis() as u64;
        let jittered_ms = rand::thread_rng().gen_range(0..=ceiling);
        Duration::from_millis(jittered_ms.max(10))
    }

    /// How long to wait before retrying after `err`, or `None` when the
    /// error must be returned as is.
    fn delay_for(&self, err: &RiftError, retry: u32) -> Option<Duration> {
        match err {
            RiftError::RateLimited {
                retry_after: Some(retry_after),
            } => (*retry_after <= self.max_retry_after).then_some(*retry_after),
            e if e.is_retryable() => Some(self.jittered_backoff(retry)),
            _ => None,
        }
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    /// Each attempt is bounded by `timeout`; an elapsed attempt counts as a
    /// transient failure.
    pub(crate) async fn run<T, F, Fut>(
        &self,
        operation: &str,
        timeout: Duration,
        mut op: F,
    ) -> RiftResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RiftResult<T>>,
    {
        let max_retries = self.max_attempts - 1;
        let mut retries = 0;

        loop {
            let result = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(RiftError::timeout(operation, timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if retries < max_retries => {
                    let Some(backoff) = self.delay_for(&e, retries + 1) else {
                        return Err(e);
                    };
                    retries += 1;

                    warn!(
                        operation,
                        error = %e,
                        retry = retries,
                        max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying stage call"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_attempts,
            base_backoff_ms: 100,
            max_backoff_ms: 1_000,
            max_retry_after_secs: 30,
        })
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy(4);
        assert_eq!(p.backoff_ceiling(1), Duration::from_millis(100));
        assert_eq!(p.backoff_ceiling(2), Duration::from_millis(200));
        assert_eq!(p.backoff_ceiling(3), Duration::from_millis(400));
        assert_eq!(p.backoff_ceiling(5), Duration::from_millis(1_000));
        assert_eq!(p.backoff_ceiling(40), Duration::from_millis(1_000));
    }

    #[test]
    fn jitter_stays_in_window() {
        let p = policy(4);
        for _ in 0..100 {
            let d = p.jittered_backoff(3);
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(400));
        }
    }

    #[test]
    fn rate_limit_beyond_cap_is_not_honoured() {
        let p = policy(4);
        let long = RiftError::RateLimited {
            retry_after: Some(Duration::from_secs(31)),
        };
        assert_eq!(p.delay_for(&long, 1), None);
        let short = RiftError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(p.delay_for(&short, 1), Some(Duration::from_secs(7)));
        assert_eq!(p.delay_for(&RiftError::not_found("m"), 1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_exactly_retry_after() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();
        let c = calls.clone();
        let value = policy(3)
            .run("fetch", Duration::from_secs(5), move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(RiftError::RateLimited {
                            retry_after: Some(Duration::from_secs(7)),
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_exhaust_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = policy(3)
            .run("fetch", Duration::from_secs(5), move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(RiftError::network("connection reset"))
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transient_network");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = policy(4)
            .run("fetch", Duration::from_secs(5), move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(RiftError::not_found("match M1"))
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RiftError::NotFound { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_attempt_counts_as_transient() {
        let err = policy(2)
            .run("fetch", Duration::from_millis(50), || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, RiftError>(())
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("fetch timed out after 50ms"));
    }
}
