use std::time::Duration;

use crate::core::tts::{TTSError, TTSResult};

/// Lower bound applied to every computed retry delay.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy for the backoff retry wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of tries, including the first (>= 1)
    pub max_attempts: u32,
    /// Delay before the second try, doubled for each subsequent one
    pub base_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Jitter as a fraction of the delay (0 = none, 1 = +/-100%)
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(30_000),
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> TTSResult<()> {
        if self.max_attempts == 0 {
            return Err(TTSError::InvalidConfiguration(
                "Retry max_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(TTSError::InvalidConfiguration(format!(
                "Retry jitter_ratio must be within [0, 1], got {}",
                self.jitter_ratio
            )));
        }
        if self.max_delay < MIN_RETRY_DELAY {
            return Err(TTSError::InvalidConfiguration(format!(
                "Retry max_delay must be at least {}ms, got {}ms",
                MIN_RETRY_DELAY.as_millis(),
                self.max_delay.as_millis()
            )));
        }
        Ok(())
    }

    /// `base_delay * 2^(attempt-1)`, capped at `max_delay`.
    ///
    /// `attempt` is the 1-based number of the try that just failed.
    pub fn pre_jitter_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let multiplier = 2u32.saturating_pow(exponent);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }

    /// Jittered delay using a fresh random sample.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_with_sample(attempt, rand::random::<f64>())
    }

    /// Jittered delay for a given uniform sample in `[0, 1]`.
    ///
    /// The result always lies in `[MIN_RETRY_DELAY, max_delay]`.
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let jitter = self.jitter_ratio.clamp(0.0, 1.0);
        let factor = 1.0 - jitter + 2.0 * jitter * sample.clamp(0.0, 1.0);
        let jittered = self.pre_jitter_delay(attempt).mul_f64(factor);
        let upper = self.max_delay.max(MIN_RETRY_DELAY);
        jittered.clamp(MIN_RETRY_DELAY, upper)
    }
}
