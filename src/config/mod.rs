//! Configuration module for the speech-synthesis service
//!
//! Configuration comes from a YAML file, environment variables (including a
//! `.env` file), or both. When both are present YAML values win and
//! environment variables fill the gaps.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use podcast_tts::config::TtsServiceConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = TtsServiceConfig::from_env()?;
//!
//! // Load from YAML file with environment variables filling the gaps
//! let config_path = PathBuf::from("config.yaml");
//! let config = TtsServiceConfig::from_file(&config_path)?;
//!
//! println!("Default provider: {}", config.default_provider);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use merge::ENV_VARS;
pub use utils::{parse_bool, parse_speaker_list};

use crate::core::retry::RetryPolicy;
use crate::core::tts::gemini::GeminiTTSConfig;
use crate::core::tts::minimax::{DEFAULT_MINIMAX_RPM, MiniMaxConfig};
use crate::core::tts::siliconflow::SiliconFlowConfig;
use crate::core::tts::{ProviderKind, SpeakerVoice, SynthesisOptions};
use crate::utils::req_manager::ReqManagerConfig;

/// Service configuration
///
/// Holds the dispatcher default, per-backend credentials and endpoints, the
/// Gemini retry policy and the outbound HTTP limits. Credentials are optional
/// here; a backend reports a missing one when it is first called.
#[derive(Debug, Clone)]
pub struct TtsServiceConfig {
    // Dispatcher settings
    pub default_provider: ProviderKind,
    pub default_language: Option<String>,
    pub prompt_template: Option<String>,
    pub voices: Vec<SpeakerVoice>,
    pub speaker_roster: Vec<SpeakerVoice>,
    pub local_engine_enabled: bool,
    pub espeak_binary: String,

    // MiniMax
    pub minimax_api_key: Option<String>,
    pub minimax_group_id: Option<String>,
    pub minimax_rpm: u32,
    pub minimax_url: Option<String>,

    // SiliconFlow
    pub siliconflow_api_key: Option<String>,
    pub siliconflow_url: Option<String>,

    // Gemini
    pub gemini_api_key: Option<String>,
    pub gemini_url: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_max_attempts: u32,
    pub gemini_base_delay_ms: u64,
    pub gemini_max_delay_ms: u64,
    pub gemini_jitter_ratio: f64,

    // Outbound HTTP
    pub request_timeout_seconds: u64,
    pub max_concurrent_requests: usize,
}

impl Default for TtsServiceConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            default_provider: ProviderKind::default(),
            default_language: None,
            prompt_template: None,
            voices: Vec::new(),
            speaker_roster: Vec::new(),
            local_engine_enabled: true,
            espeak_binary: "espeak-ng".to_string(),
            minimax_api_key: None,
            minimax_group_id: None,
            minimax_rpm: DEFAULT_MINIMAX_RPM,
            minimax_url: None,
            siliconflow_api_key: None,
            siliconflow_url: None,
            gemini_api_key: None,
            gemini_url: None,
            gemini_model: None,
            gemini_max_attempts: retry.max_attempts,
            gemini_base_delay_ms: retry.base_delay.as_millis() as u64,
            gemini_max_delay_ms: retry.max_delay.as_millis() as u64,
            gemini_jitter_ratio: retry.jitter_ratio,
            request_timeout_seconds: 30,
            max_concurrent_requests: 4,
        }
    }
}

impl TtsServiceConfig {
    /// Load configuration from a YAML file, with environment variables
    /// filling anything the file leaves out
    ///
    /// The `.env` file is not read here; only real environment variables apply.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.gemini_max_attempts,
            base_delay: Duration::from_millis(self.gemini_base_delay_ms),
            max_delay: Duration::from_millis(self.gemini_max_delay_ms),
            jitter_ratio: self.gemini_jitter_ratio,
        }
    }

    pub fn req_manager_config(&self) -> ReqManagerConfig {
        ReqManagerConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            ..Default::default()
        }
    }

    pub fn minimax_config(&self) -> MiniMaxConfig {
        MiniMaxConfig {
            api_key: self.minimax_api_key.clone(),
            group_id: self.minimax_group_id.clone(),
            base_url: self.minimax_url.clone(),
            default_language: self.default_language.clone(),
        }
    }

    pub fn siliconflow_config(&self) -> SiliconFlowConfig {
        SiliconFlowConfig {
            api_key: self.siliconflow_api_key.clone(),
            base_url: self.siliconflow_url.clone(),
        }
    }

    pub fn gemini_config(&self) -> GeminiTTSConfig {
        GeminiTTSConfig {
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_url.clone(),
            model: self.gemini_model.clone(),
            prompt_template: self.prompt_template.clone(),
            retry: self.retry_policy(),
        }
    }

    /// Per-call options seeded from configuration
    pub fn default_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            provider: Some(self.default_provider),
            language: self.default_language.clone(),
            voices_by_speaker: self.voices.clone(),
            prompt_template: self.prompt_template.clone(),
            speaker_roster: self.speaker_roster.clone(),
            ..Default::default()
        }
    }

    /// Whether the backend has the credential it needs
    pub fn has_credentials(&self, provider: ProviderKind) -> bool {
        let key = match provider {
            ProviderKind::Local => return self.local_engine_enabled,
            ProviderKind::MiniMax => &self.minimax_api_key,
            ProviderKind::SiliconFlow => &self.siliconflow_api_key,
            ProviderKind::Gemini => &self.gemini_api_key,
        };
        key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}
