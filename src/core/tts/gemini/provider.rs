//! Gemini multi-speaker client.
//!
//! Gemini only synthesizes whole scripts: the single-line contract is rejected
//! before any I/O. Each script call is wrapped in [`with_retry`] and the
//! inline base64 audio it returns (usually `audio/L16;codec=pcm;rate=24000`)
//! is containerized by the normalizer.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::config::{GEMINI_BASE_URL, GEMINI_MAX_SPEAKERS, GeminiTTSConfig};
use crate::core::audio::normalize_audio;
use crate::core::retry::{Clock, with_retry};
use crate::core::tts::base::{
    ProviderKind, SpeakerVoice, SpeechSynthesizer, SynthesisOptions, SynthesisResult, TTSError,
    TTSResult,
};
use crate::core::tts::prompt::{DEFAULT_PROMPT_TEMPLATE, build_script_prompt};
use crate::core::tts::provider::{TTSRequestBuilder, send_request};
use crate::utils::req_manager::ReqManager;

/// Characters of response text kept in the malformed-response diagnostic.
const DIAGNOSTIC_TEXT_CHARS: usize = 200;

/// Builds `generateContent` requests for a fixed speaker roster.
#[derive(Debug, Clone)]
pub struct GeminiRequestBuilder {
    url: String,
    api_key: String,
    roster: Vec<SpeakerVoice>,
}

impl GeminiRequestBuilder {
    pub fn new(url: String, api_key: String, roster: Vec<SpeakerVoice>) -> Self {
        Self {
            url,
            api_key,
            roster,
        }
    }

    fn voice_config(voice_id: &str) -> serde_json::Value {
        serde_json::json!({ "prebuiltVoiceConfig": { "voiceName": voice_id } })
    }

    fn speech_config(&self) -> serde_json::Value {
        if let [only] = self.roster.as_slice() {
            return serde_json::json!({ "voiceConfig": Self::voice_config(&only.voice_id) });
        }

        let speakers: Vec<serde_json::Value> = self
            .roster
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "speaker": entry.speaker_id,
                    "voiceConfig": Self::voice_config(&entry.voice_id),
                })
            })
            .collect();
        serde_json::json!({
            "multiSpeakerVoiceConfig": { "speakerVoiceConfigs": speakers }
        })
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": self.speech_config(),
            }
        })
    }
}

impl TTSRequestBuilder for GeminiRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(text))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    fn first_inline_audio(&self) -> Option<&InlineData> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| d.data.as_deref().is_some_and(|data| !data.is_empty()))
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .iter()
            .find_map(|c| c.finish_reason.as_deref())
    }

    /// Bounded summary of the response shape, for logging only.
    fn diagnostic(&self) -> serde_json::Value {
        let text: String = self
            .parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(DIAGNOSTIC_TEXT_CHARS)
            .collect();
        serde_json::json!({
            "candidate_count": self.candidates.len(),
            "finish_reason": self.finish_reason(),
            "has_inline_data": self.parts().any(|p| p.inline_data.is_some()),
            "text_preview": text,
        })
    }
}

/// Extract and decode the inline audio of a `generateContent` response.
fn parse_response(body: &[u8]) -> TTSResult<(String, Vec<u8>)> {
    let response: GenerateContentResponse = serde_json::from_slice(body).map_err(|e| {
        TTSError::MalformedResponse(format!("Failed to parse Gemini response: {e}"))
    })?;

    let Some(inline) = response.first_inline_audio() else {
        error!(
            diagnostic = %response.diagnostic(),
            "Gemini response carried no inline audio data"
        );
        return Err(TTSError::MalformedResponse(format!(
            "Gemini response carried no inline audio data (finish reason: {})",
            response.finish_reason().unwrap_or("none")
        )));
    };

    let audio = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_deref().unwrap_or_default())
        .map_err(|e| TTSError::MalformedResponse(format!("Failed to decode base64 audio: {e}")))?;
    let mime_type = inline
        .mime_type
        .clone()
        .unwrap_or_else(|| "audio/L16;codec=pcm;rate=24000".to_string());

    Ok((mime_type, audio))
}

/// Validated roster: non-empty, within the speaker limit, every voice set.
fn validate_roster(roster: &[SpeakerVoice]) -> TTSResult<()> {
    if roster.is_empty() {
        return Err(TTSError::InvalidConfiguration(
            "Gemini requires a speaker roster".to_string(),
        ));
    }
    if roster.len() > GEMINI_MAX_SPEAKERS {
        return Err(TTSError::InvalidConfiguration(format!(
            "Gemini supports at most {GEMINI_MAX_SPEAKERS} speakers, roster has {}",
            roster.len()
        )));
    }
    if let Some(entry) = roster
        .iter()
        .find(|e| e.speaker_id.trim().is_empty() || e.voice_id.trim().is_empty())
    {
        return Err(TTSError::InvalidConfiguration(format!(
            "Gemini roster entry '{}' needs both a speaker id and a voice id",
            entry.speaker_id
        )));
    }
    Ok(())
}

/// Flexible multi-speaker backend.
pub struct GeminiTTS {
    config: GeminiTTSConfig,
    req_manager: Arc<ReqManager>,
    clock: Arc<dyn Clock>,
}

impl GeminiTTS {
    pub fn new(
        config: GeminiTTSConfig,
        req_manager: Arc<ReqManager>,
        clock: Arc<dyn Clock>,
    ) -> TTSResult<Self> {
        config.retry.validate()?;
        Ok(Self {
            config,
            req_manager,
            clock,
        })
    }

    fn api_key(&self) -> TTSResult<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration("Gemini API key is not configured".to_string())
            })
    }

    fn request_builder(&self, options: &SynthesisOptions) -> TTSResult<GeminiRequestBuilder> {
        let api_key = self.api_key()?;
        validate_roster(&options.speaker_roster)?;

        let base = options.endpoint(self.config.base_url.as_deref().unwrap_or(GEMINI_BASE_URL));
        let model = self.config.model_or_default(options.model.as_deref());

        Ok(GeminiRequestBuilder::new(
            GeminiTTSConfig::generate_content_url(base, model),
            api_key.to_string(),
            options.speaker_roster.clone(),
        ))
    }

    fn build_prompt(&self, lines: &[String], options: &SynthesisOptions) -> TTSResult<String> {
        let speakers: Vec<&str> = options
            .speaker_roster
            .iter()
            .map(|e| e.speaker_id.as_str())
            .collect();
        let template = options
            .prompt_template
            .as_deref()
            .or(self.config.prompt_template.as_deref())
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE);
        build_script_prompt(lines, &speakers, template)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiTTS {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn synthesize(
        &self,
        _text: &str,
        speaker_id: &str,
        _options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        Err(TTSError::UnsupportedOperation(format!(
            "gemini only synthesizes multi-speaker scripts; route line for speaker '{speaker_id}' through synthesize_script"
        )))
    }

    async fn synthesize_script(
        &self,
        lines: &[String],
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        let builder = self.request_builder(options)?;
        let prompt = self.build_prompt(lines, options)?;
        debug!(
            "Gemini script prompt: {} chars for {} speaker(s)",
            prompt.len(),
            options.speaker_roster.len()
        );

        let (mime_type, audio) = with_retry(
            &self.config.retry,
            self.clock.as_ref(),
            "Gemini script synthesis",
            |_attempt| {
                let builder = &builder;
                let prompt = prompt.as_str();
                async move {
                    let response = send_request(&self.req_manager, builder, prompt).await?;
                    parse_response(&response.body)
                }
            },
        )
        .await?;

        info!(
            "Gemini synthesized {} bytes of {} for {} line(s)",
            audio.len(),
            mime_type,
            lines.len()
        );
        normalize_audio(&mime_type, audio)
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "gemini",
            "multi_speaker": true,
            "max_speakers": GEMINI_MAX_SPEAKERS,
            "max_attempts": self.config.retry.max_attempts,
        })
    }
}
