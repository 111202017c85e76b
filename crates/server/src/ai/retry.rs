//! Retry-until-valid combinator with exponential backoff

use std::future::Future;
use std::time::Duration;

use super::error::AiError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given zero-indexed attempt fails
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// `op` receives the zero-indexed attempt number. Any error is retried; the
/// last one is wrapped in [`AiError::Exhausted`].
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    purpose: &'static str,
    mut op: F,
) -> Result<T, AiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => {
                metrics::counter!("ai_attempts_total", "purpose" => purpose, "result" => "ok")
                    .increment(1);
                return Ok(value);
            }
            Err(err) => {
                let kind = err.kind().as_str();
                metrics::counter!("ai_attempts_total", "purpose" => purpose, "result" => kind)
                    .increment(1);

                if attempt + 1 >= attempts {
                    tracing::warn!(purpose, attempts, error_kind = kind, "Completion attempts exhausted");
                    return Err(AiError::Exhausted {
                        attempts,
                        last: Box::new(err),
                    });
                }

                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    purpose,
                    attempt = attempt + 1,
                    error_kind = kind,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Completion attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use whichdoctor_core::ContractViolation;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn succeeds_once_validation_passes() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast(), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(AiError::ContractInvalid(ContractViolation::NoJson))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wraps_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AiError> = retry_with_backoff(&fast(), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 2 {
                    Err(AiError::RateLimited)
                } else {
                    Err(AiError::Network("down".into()))
                }
            }
        })
        .await;

        match result {
            Err(AiError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, AiError::RateLimited));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
