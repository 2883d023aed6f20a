//! # TTS Base Types
//!
//! This module provides the shared contract for every speech-synthesis backend.
//! A backend receives a single line of text (or a whole multi-speaker script),
//! the runtime [`SynthesisOptions`] supplied by the caller, and returns one
//! finished [`SynthesisResult`] holding a playable audio blob.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use podcast_tts::core::tts::{SpeechSynthesizer, SynthesisOptions, ProviderKind};
//!
//! async fn example(dispatcher: &podcast_tts::TtsDispatcher) -> Result<(), podcast_tts::TTSError> {
//!     let options = SynthesisOptions {
//!         provider: Some(ProviderKind::SiliconFlow),
//!         ..Default::default()
//!     };
//!
//!     let result = dispatcher.synthesize("Welcome to the show!", "host", &options).await?;
//!     println!("{} bytes of {}", result.audio.len(), result.mime_type);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::retry::ClassifiedError;

/// TTS-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Empty script: {0}")]
    EmptyScript(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("HTTP error ({status}): {message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Provider error ({}): {message}", .code.as_deref().unwrap_or("unknown"))]
    ProviderError {
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),

    /// Final failure of a retried call, with its classification attached.
    #[error("{error} after {attempts} attempt(s)")]
    Classified {
        attempts: u32,
        error: ClassifiedError,
        source: Box<TTSError>,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl TTSError {
    /// HTTP status carried by this error, looking through a wrapped cause.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TTSError::Http { status, .. } => Some(*status),
            TTSError::Classified { error, source, .. } => {
                error.status.or_else(|| source.status_code())
            }
            _ => None,
        }
    }

    /// Vendor error code carried by this error, if any.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            TTSError::Http { code, .. } | TTSError::ProviderError { code, .. } => code.as_deref(),
            TTSError::Classified { error, source, .. } => {
                error.code.as_deref().or_else(|| source.error_code())
            }
            _ => None,
        }
    }

    /// The innermost error, unwrapping retry classification.
    pub fn root_cause(&self) -> &TTSError {
        match self {
            TTSError::Classified { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// Closed set of synthesis backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// In-process speech engine, no network.
    #[default]
    Local,
    /// MiniMax T2A, strict requests-per-minute ceiling.
    MiniMax,
    /// SiliconFlow audio/speech, binary response body.
    SiliconFlow,
    /// Gemini multi-speaker speech generation.
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Local,
        ProviderKind::MiniMax,
        ProviderKind::SiliconFlow,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::MiniMax => "minimax",
            ProviderKind::SiliconFlow => "siliconflow",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Whether the backend synthesizes whole multi-speaker scripts.
    pub fn supports_multi_speaker(&self) -> bool {
        matches!(self, ProviderKind::Gemini)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "edge" => Ok(ProviderKind::Local),
            "minimax" => Ok(ProviderKind::MiniMax),
            "siliconflow" | "silicon-flow" => Ok(ProviderKind::SiliconFlow),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(TTSError::InvalidConfiguration(format!(
                "Unsupported TTS provider: {other}. Supported providers: local, minimax, siliconflow, gemini"
            ))),
        }
    }
}

/// Speaking speed, encoded per backend.
///
/// Numeric values are multipliers (`1.0` is normal). Textual values are either
/// a plain number (`"1.2"`) or a signed percentage (`"+10%"`, `"-5%"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Speed {
    Numeric(f32),
    Text(String),
}

impl Speed {
    /// Speed as a multiplier, if it can be interpreted as one.
    pub fn as_factor(&self) -> Option<f32> {
        match self {
            Speed::Numeric(value) => Some(*value),
            Speed::Text(text) => {
                let text = text.trim();
                if let Some(percent) = text.strip_suffix('%') {
                    percent
                        .trim()
                        .parse::<f32>()
                        .ok()
                        .map(|p| 1.0 + p / 100.0)
                } else {
                    text.parse::<f32>().ok()
                }
            }
        }
    }
}

/// One speaker-to-voice assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVoice {
    pub speaker_id: String,
    pub voice_id: String,
}

impl SpeakerVoice {
    pub fn new(speaker_id: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// Per-call synthesis configuration supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    /// Backend to use; the dispatcher default applies when unset
    pub provider: Option<ProviderKind>,
    /// Language hint (e.g. "en", "zh")
    pub language: Option<String>,
    /// Backend model identifier
    pub model: Option<String>,
    /// Speaking speed
    pub speed: Option<Speed>,
    /// Endpoint override
    pub api_url: Option<String>,
    /// Speaker to voice mapping, in speaker priority order
    pub voices_by_speaker: Vec<SpeakerVoice>,
    /// Instruction preamble for multi-speaker backends
    pub prompt_template: Option<String>,
    /// Ordered speakers for multi-speaker backends
    pub speaker_roster: Vec<SpeakerVoice>,
}

impl SynthesisOptions {
    /// Explicit voice mapped to `speaker_id`, if the caller supplied one.
    pub fn voice_for(&self, speaker_id: &str) -> Option<&str> {
        self.voices_by_speaker
            .iter()
            .find(|v| v.speaker_id == speaker_id)
            .map(|v| v.voice_id.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Speakers in priority order: the roster when present, else the voice map keys.
    pub fn configured_speakers(&self) -> Vec<&str> {
        let source = if self.speaker_roster.is_empty() {
            &self.voices_by_speaker
        } else {
            &self.speaker_roster
        };
        source.iter().map(|v| v.speaker_id.as_str()).collect()
    }

    pub fn speed_factor(&self) -> f32 {
        self.speed
            .as_ref()
            .and_then(Speed::as_factor)
            .unwrap_or(1.0)
    }

    /// `api_url` override when non-empty, else `default_url`.
    pub fn endpoint<'a>(&'a self, default_url: &'a str) -> &'a str {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(default_url)
    }
}

/// A finished audio artifact. Ownership of the buffer passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    /// Playable audio bytes
    pub audio: Vec<u8>,
    /// MIME type of `audio`
    pub mime_type: String,
    /// File extension derived from `mime_type`, without the dot
    pub extension: String,
}

impl SynthesisResult {
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension)
    }

    pub fn len(&self) -> usize {
        self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }
}

/// Shared synthesis contract implemented by every backend client.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Which backend this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Synthesize one line spoken by `speaker_id`.
    async fn synthesize(
        &self,
        text: &str,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult>;

    /// Synthesize a whole multi-speaker script.
    ///
    /// Backends without multi-speaker support reject this before any I/O.
    async fn synthesize_script(
        &self,
        lines: &[String],
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        let _ = (lines, options);
        Err(TTSError::UnsupportedOperation(format!(
            "{} does not support multi-speaker scripts",
            self.kind()
        )))
    }

    /// Get provider-specific information
    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": self.kind().as_str(),
            "multi_speaker": self.kind().supports_multi_speaker(),
        })
    }
}
