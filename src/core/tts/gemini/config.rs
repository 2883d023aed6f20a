//! Gemini speech-generation configuration.

use crate::core::retry::RetryPolicy;

/// API host; the model path is appended per request.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Gemini accepts at most this many voices in `multiSpeakerVoiceConfig`.
pub const GEMINI_MAX_SPEAKERS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct GeminiTTSConfig {
    pub api_key: Option<String>,
    /// Host override; `SynthesisOptions::api_url` wins over this
    pub base_url: Option<String>,
    /// Model used when the call does not name one
    pub model: Option<String>,
    /// Preamble used when the call does not supply `prompt_template`
    pub prompt_template: Option<String>,
    pub retry: RetryPolicy,
}

impl GeminiTTSConfig {
    pub fn model_or_default<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.model.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(GEMINI_DEFAULT_MODEL)
    }

    /// `POST {base}/v1beta/models/{model}:generateContent`
    pub fn generate_content_url(base: &str, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            base.trim_end_matches('/'),
            model
        )
    }
}
