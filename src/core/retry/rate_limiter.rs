use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::clock::Clock;
use crate::core::tts::{TTSError, TTSResult};

/// Minimum-spacing limiter for backends with a hard requests-per-minute ceiling.
///
/// One instance is owned by the composition root and shared by every client of
/// the backend it guards. The read of `last_request_at` and the stamp that
/// follows are separated by the wait, so two concurrent callers can both pass
/// with the same observation. Callers that need a hard guarantee must serialize
/// calls to the backend themselves.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request_at: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_request_at: Mutex::new(None),
            clock,
        }
    }

    /// Spacing of `floor(60000 / rpm)` milliseconds plus `safety_margin`.
    pub fn from_rpm(rpm: u32, safety_margin: Duration, clock: Arc<dyn Clock>) -> TTSResult<Self> {
        if rpm == 0 {
            return Err(TTSError::InvalidConfiguration(
                "Requests-per-minute limit must be greater than zero".to_string(),
            ));
        }
        let interval = Duration::from_millis(60_000 / u64::from(rpm)) + safety_margin;
        Ok(Self::new(interval, clock))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        *self.last_request_at.lock()
    }

    /// Wait out the remainder of the interval, then stamp the call time.
    ///
    /// Must be awaited immediately before each outbound attempt, retries included.
    pub async fn acquire(&self) {
        let wait = {
            let last = *self.last_request_at.lock();
            last.and_then(|at| {
                let elapsed = self.clock.now().saturating_duration_since(at);
                self.min_interval.checked_sub(elapsed)
            })
        };

        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            debug!("Rate limiter waiting {}ms before next request", wait.as_millis());
            self.clock.sleep(wait).await;
        }

        *self.last_request_at.lock() = Some(self.clock.now());
    }
}
