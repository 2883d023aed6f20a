//! Retryable-vs-fatal classification for synthesis failures.

use std::fmt;

use serde::Serialize;

use crate::core::tts::TTSError;

/// Transient HTTP status codes worth retrying.
pub const RETRYABLE_STATUS_CODES: [u16; 12] =
    [408, 409, 425, 429, 500, 502, 503, 504, 520, 522, 523, 524];

/// Message fragments (lowercase) that mark a status-less failure as transient.
pub const RETRYABLE_MESSAGE_PATTERNS: [&str; 12] = [
    "timeout",
    "timed out",
    "etimedout",
    "rate limit",
    "too many requests",
    "resource exhausted",
    "bad gateway",
    "gateway timeout",
    "upstream",
    "econnreset",
    "connection reset",
    "socket hang up",
];

/// Normalized view of a failure, attached to retried errors for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " [status={status}]")?;
        }
        if let Some(code) = &self.code {
            write!(f, " [code={code}]")?;
        }
        write!(f, " [retryable={}]", self.retryable)
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// Classify a failure as retryable or fatal.
///
/// A status code, when present, decides alone. Only status-less failures fall
/// back to message sniffing.
pub fn classify_error(error: &TTSError) -> ClassifiedError {
    if let TTSError::Classified { error, .. } = error {
        return error.clone();
    }

    let status = error.status_code();
    let message = error.to_string();
    let retryable = match (error, status) {
        (
            TTSError::InvalidConfiguration(_)
            | TTSError::InvalidInput(_)
            | TTSError::EmptyScript(_)
            | TTSError::UnsupportedOperation(_)
            | TTSError::MalformedResponse(_),
            _,
        ) => false,
        (_, Some(status)) => is_retryable_status(status),
        (_, None) => is_retryable_message(&message),
    };

    ClassifiedError {
        status,
        code: error.error_code().map(str::to_string),
        message,
        retryable,
    }
}
