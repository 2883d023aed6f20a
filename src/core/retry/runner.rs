use std::future::Future;

use tracing::{error, info, warn};

use super::backoff::RetryPolicy;
use super::classify::classify_error;
use super::clock::Clock;
use crate::core::tts::{TTSError, TTSResult};

/// Run `operation` under `policy`, retrying retryable failures with backoff.
///
/// `operation` receives the 1-based attempt number. Non-retryable failures
/// stop the loop immediately. The final failure is returned as
/// [`TTSError::Classified`] carrying the attempt count and classification.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    operation_name: &str,
    mut operation: F,
) -> TTSResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = TTSResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{operation_name} succeeded on attempt {attempt}/{max_attempts}");
                }
                return Ok(value);
            }
            Err(err) => {
                let classified = classify_error(&err);

                if !classified.retryable || attempt >= max_attempts {
                    error!(
                        status = ?classified.status,
                        code = ?classified.code,
                        retryable = classified.retryable,
                        "{operation_name} failed on attempt {attempt}/{max_attempts}: {}",
                        classified.message
                    );
                    return Err(TTSError::Classified {
                        attempts: attempt,
                        error: classified,
                        source: Box::new(err),
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    status = ?classified.status,
                    code = ?classified.code,
                    "{operation_name} attempt {attempt}/{max_attempts} failed, retrying in {}ms: {}",
                    delay.as_millis(),
                    classified.message
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::retry::backoff::MIN_RETRY_DELAY;
    use crate::core::retry::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            jitter_ratio: 0.0,
        }
    }

    #[tokio::test]
    async fn test_always_retryable_failure_uses_every_attempt() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);

        let result: TTSResult<()> = with_retry(&policy(4), &clock, "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TTSError::Http {
                    status: 503,
                    code: None,
                    message: "unavailable".to_string(),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000)
            ]
        );
        match result {
            Err(TTSError::Classified {
                attempts, error, ..
            }) => {
                assert_eq!(attempts, 4);
                assert_eq!(error.status, Some(503));
                assert!(error.retryable);
            }
            other => panic!("Expected Classified error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_failure_aborts_immediately() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);

        let result: TTSResult<()> = with_retry(&policy(5), &clock, "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TTSError::Http {
                    status: 401,
                    code: None,
                    message: "unauthorized".to_string(),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
        match result {
            Err(TTSError::Classified {
                attempts, error, ..
            }) => {
                assert_eq!(attempts, 1);
                assert!(!error.retryable);
            }
            other => panic!("Expected Classified error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let clock = ManualClock::new();

        let result = with_retry(&policy(5), &clock, "test", |attempt| async move {
            if attempt < 3 {
                Err(TTSError::TimeoutError("request timed out".to_string()))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(clock.sleeps().len(), 2);
        assert!(clock.sleeps().iter().all(|d| *d >= MIN_RETRY_DELAY));
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);

        let result: TTSResult<()> = with_retry(&policy(1), &clock, "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TTSError::NetworkError("connection reset".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
