use super::TtsServiceConfig;
use crate::core::retry::MIN_RETRY_DELAY;

/// Validate the MiniMax requests-per-minute ceiling
pub fn validate_rpm(rpm: u32) -> Result<(), Box<dyn std::error::Error>> {
    if rpm == 0 {
        return Err("MINIMAX_RPM must be greater than 0".into());
    }
    Ok(())
}

/// Validate the Gemini retry settings
///
/// `max_delay_ms` may not fall below the global retry floor, otherwise the
/// floor and the cap would contradict each other.
pub fn validate_retry(
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_ratio: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    if max_attempts == 0 {
        return Err("GEMINI_MAX_ATTEMPTS must be at least 1".into());
    }
    if !(0.0..=1.0).contains(&jitter_ratio) {
        return Err(format!("GEMINI_JITTER_RATIO must be within [0, 1], got {jitter_ratio}").into());
    }
    let floor_ms = MIN_RETRY_DELAY.as_millis() as u64;
    if max_delay_ms < floor_ms {
        return Err(format!(
            "GEMINI_MAX_DELAY_MS must be at least {floor_ms}, got {max_delay_ms}"
        )
        .into());
    }
    if base_delay_ms > max_delay_ms {
        return Err(format!(
            "GEMINI_BASE_DELAY_MS ({base_delay_ms}) must not exceed GEMINI_MAX_DELAY_MS ({max_delay_ms})"
        )
        .into());
    }
    Ok(())
}

/// Validate outbound HTTP limits
pub fn validate_http(
    request_timeout_seconds: u64,
    max_concurrent_requests: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if request_timeout_seconds == 0 {
        return Err("TTS_REQUEST_TIMEOUT_SECONDS must be greater than 0".into());
    }
    if max_concurrent_requests == 0 || max_concurrent_requests > 1000 {
        return Err(format!(
            "TTS_MAX_CONCURRENT_REQUESTS must be within 1..=1000, got {max_concurrent_requests}"
        )
        .into());
    }
    Ok(())
}

/// Run every check against a loaded configuration
pub fn validate_config(config: &TtsServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_rpm(config.minimax_rpm)?;
    validate_retry(
        config.gemini_max_attempts,
        config.gemini_base_delay_ms,
        config.gemini_max_delay_ms,
        config.gemini_jitter_ratio,
    )?;
    validate_http(
        config.request_timeout_seconds,
        config.max_concurrent_requests,
    )?;
    Ok(())
}
