//! Retry, backoff and rate limiting shared by the synthesis backends.
//!
//! - `backoff`: [`RetryPolicy`] and the pure delay computation
//! - `classify`: retryable-vs-fatal classification into [`ClassifiedError`]
//! - `clock`: injectable time source ([`TokioClock`], [`ManualClock`])
//! - `rate_limiter`: minimum-spacing [`RateLimiter`] for strict RPM backends
//! - `runner`: the [`with_retry`] loop

pub mod backoff;
pub mod classify;
pub mod clock;
pub mod rate_limiter;
pub mod runner;

pub use backoff::{MIN_RETRY_DELAY, RetryPolicy};
pub use classify::{
    ClassifiedError, RETRYABLE_MESSAGE_PATTERNS, RETRYABLE_STATUS_CODES, classify_error,
    is_retryable_message, is_retryable_status,
};
pub use clock::{Clock, ManualClock, TokioClock};
pub use rate_limiter::RateLimiter;
pub use runner::with_retry;
