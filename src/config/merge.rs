use std::env;
use std::str::FromStr;

use super::TtsServiceConfig;
use super::utils::{parse_bool, parse_speaker_list};
use super::yaml::YamlConfig;
use crate::core::tts::ProviderKind;

/// Every environment variable read by [`merge_config`].
pub const ENV_VARS: [&str; 22] = [
    "TTS_PROVIDER",
    "TTS_LANGUAGE",
    "TTS_PROMPT_TEMPLATE",
    "TTS_VOICES",
    "TTS_SPEAKER_ROSTER",
    "TTS_LOCAL_ENGINE_ENABLED",
    "ESPEAK_BINARY",
    "MINIMAX_API_KEY",
    "MINIMAX_GROUP_ID",
    "MINIMAX_RPM",
    "MINIMAX_URL",
    "SILICONFLOW_API_KEY",
    "SILICONFLOW_URL",
    "GEMINI_API_KEY",
    "GEMINI_URL",
    "GEMINI_MODEL",
    "GEMINI_MAX_ATTEMPTS",
    "GEMINI_BASE_DELAY_MS",
    "GEMINI_MAX_DELAY_MS",
    "GEMINI_JITTER_RATIO",
    "TTS_REQUEST_TIMEOUT_SECONDS",
    "TTS_MAX_CONCURRENT_REQUESTS",
];

fn parse_env<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} environment variable '{raw}': {e}").into()),
        _ => Ok(None),
    }
}

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<TtsServiceConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let defaults = TtsServiceConfig::default();

    // Helper macro for optional values: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            $yaml_value.or_else(|| env::var($env_var).ok().filter(|v| !v.trim().is_empty()))
        };
    }

    // Helper macro for typed values: YAML > ENV (parsed) > Default
    macro_rules! get_parsed {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => parse_env($env_var)?.unwrap_or($default),
            }
        };
    }

    let tts = yaml.tts.unwrap_or_default();
    let minimax = yaml.minimax.unwrap_or_default();
    let siliconflow = yaml.siliconflow.unwrap_or_default();
    let gemini = yaml.gemini.unwrap_or_default();
    let http = yaml.http.unwrap_or_default();

    let default_provider = match get_optional!("TTS_PROVIDER", tts.provider) {
        Some(name) => ProviderKind::from_str(&name)?,
        None => defaults.default_provider,
    };

    let local_engine_enabled = match tts.local_engine_enabled {
        Some(enabled) => enabled,
        None => match env::var("TTS_LOCAL_ENGINE_ENABLED") {
            Ok(raw) => parse_bool(&raw)
                .ok_or_else(|| format!("Invalid TTS_LOCAL_ENGINE_ENABLED value: {raw}"))?,
            Err(_) => defaults.local_engine_enabled,
        },
    };

    let voices = match tts.voices {
        Some(voices) => voices,
        None => match env::var("TTS_VOICES") {
            Ok(raw) => parse_speaker_list(&raw).map_err(|e| format!("Invalid TTS_VOICES: {e}"))?,
            Err(_) => Vec::new(),
        },
    };

    let speaker_roster = match tts.speaker_roster {
        Some(roster) => roster,
        None => match env::var("TTS_SPEAKER_ROSTER") {
            Ok(raw) => parse_speaker_list(&raw)
                .map_err(|e| format!("Invalid TTS_SPEAKER_ROSTER: {e}"))?,
            Err(_) => Vec::new(),
        },
    };

    Ok(TtsServiceConfig {
        default_provider,
        default_language: get_optional!("TTS_LANGUAGE", tts.language),
        prompt_template: get_optional!("TTS_PROMPT_TEMPLATE", tts.prompt_template),
        voices,
        speaker_roster,
        local_engine_enabled,
        espeak_binary: get_optional!("ESPEAK_BINARY", tts.espeak_binary)
            .unwrap_or(defaults.espeak_binary),

        minimax_api_key: get_optional!("MINIMAX_API_KEY", minimax.api_key),
        minimax_group_id: get_optional!("MINIMAX_GROUP_ID", minimax.group_id),
        minimax_rpm: get_parsed!("MINIMAX_RPM", minimax.rpm, defaults.minimax_rpm),
        minimax_url: get_optional!("MINIMAX_URL", minimax.url),

        siliconflow_api_key: get_optional!("SILICONFLOW_API_KEY", siliconflow.api_key),
        siliconflow_url: get_optional!("SILICONFLOW_URL", siliconflow.url),

        gemini_api_key: get_optional!("GEMINI_API_KEY", gemini.api_key),
        gemini_url: get_optional!("GEMINI_URL", gemini.url),
        gemini_model: get_optional!("GEMINI_MODEL", gemini.model),
        gemini_max_attempts: get_parsed!(
            "GEMINI_MAX_ATTEMPTS",
            gemini.max_attempts,
            defaults.gemini_max_attempts
        ),
        gemini_base_delay_ms: get_parsed!(
            "GEMINI_BASE_DELAY_MS",
            gemini.base_delay_ms,
            defaults.gemini_base_delay_ms
        ),
        gemini_max_delay_ms: get_parsed!(
            "GEMINI_MAX_DELAY_MS",
            gemini.max_delay_ms,
            defaults.gemini_max_delay_ms
        ),
        gemini_jitter_ratio: get_parsed!(
            "GEMINI_JITTER_RATIO",
            gemini.jitter_ratio,
            defaults.gemini_jitter_ratio
        ),

        request_timeout_seconds: get_parsed!(
            "TTS_REQUEST_TIMEOUT_SECONDS",
            http.request_timeout_seconds,
            defaults.request_timeout_seconds
        ),
        max_concurrent_requests: get_parsed!(
            "TTS_MAX_CONCURRENT_REQUESTS",
            http.max_concurrent_requests,
            defaults.max_concurrent_requests
        ),
    })
}

#[cfg(test)]
pub(crate) fn cleanup_env_vars() {
    unsafe {
        for name in ENV_VARS {
            env::remove_var(name);
        }
    }
}
