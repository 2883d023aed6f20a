use serde::Deserialize;
use std::path::PathBuf;

use crate::core::tts::SpeakerVoice;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything missing
/// falls back to environment variables, then defaults.
///
/// # Example YAML structure
/// ```yaml
/// tts:
///   provider: "gemini"
///   language: "en"
///   prompt_template: "TTS the following conversation between {speakers}:"
///   local_engine_enabled: true
///   espeak_binary: "espeak-ng"
///   voices:
///     - speaker_id: "host"
///       voice_id: "male-qn-qingse"
///   speaker_roster:
///     - speaker_id: "Alice"
///       voice_id: "Kore"
///     - speaker_id: "Bob"
///       voice_id: "Puck"
///
/// minimax:
///   api_key: "your-minimax-key"
///   group_id: "your-group-id"
///   rpm: 20
///
/// siliconflow:
///   api_key: "your-siliconflow-key"
///
/// gemini:
///   api_key: "your-gemini-key"
///   model: "gemini-2.5-flash-preview-tts"
///   max_attempts: 5
///   base_delay_ms: 2000
///   max_delay_ms: 30000
///   jitter_ratio: 0.2
///
/// http:
///   request_timeout_seconds: 30
///   max_concurrent_requests: 4
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub tts: Option<TtsYaml>,
    pub minimax: Option<MiniMaxYaml>,
    pub siliconflow: Option<SiliconFlowYaml>,
    pub gemini: Option<GeminiYaml>,
    pub http: Option<HttpYaml>,
}

/// Dispatcher-wide settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub provider: Option<String>,
    pub language: Option<String>,
    pub prompt_template: Option<String>,
    pub local_engine_enabled: Option<bool>,
    pub espeak_binary: Option<String>,
    pub voices: Option<Vec<SpeakerVoice>>,
    pub speaker_roster: Option<Vec<SpeakerVoice>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MiniMaxYaml {
    pub api_key: Option<String>,
    pub group_id: Option<String>,
    pub rpm: Option<u32>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SiliconFlowYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeminiYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter_ratio: Option<f64>,
}

/// Outbound HTTP settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HttpYaml {
    pub request_timeout_seconds: Option<u64>,
    pub max_concurrent_requests: Option<usize>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
