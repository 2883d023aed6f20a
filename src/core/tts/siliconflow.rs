//! SiliconFlow `audio/speech` backend (OpenAI-compatible, binary response).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::base::{
    ProviderKind, SpeechSynthesizer, SynthesisOptions, SynthesisResult, TTSError, TTSResult,
};
use super::provider::{TTSRequestBuilder, send_request};
use super::voices::{VoicePair, resolve_voice};
use crate::core::audio::normalize_audio;
use crate::utils::req_manager::ReqManager;

pub const SILICONFLOW_TTS_URL: &str = "https://api.siliconflow.cn/v1/audio/speech";
pub const SILICONFLOW_DEFAULT_MODEL: &str = "FunAudioLLM/CosyVoice2-0.5B";

/// Built-in voice names; qualified with the model as `{model}:{voice}`.
pub const SILICONFLOW_VOICES: VoicePair = VoicePair {
    male: "alex",
    female: "anna",
};

#[derive(Debug, Clone, Default)]
pub struct SiliconFlowConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Qualify a bare voice name with the model; custom voice URIs pass through.
pub fn qualified_voice(model: &str, voice: &str) -> String {
    if voice.contains(':') {
        voice.to_string()
    } else {
        format!("{model}:{voice}")
    }
}

#[derive(Debug, Clone)]
pub struct SiliconFlowRequestBuilder {
    url: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
}

impl SiliconFlowRequestBuilder {
    fn build_request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "mp3",
            "speed": self.speed,
        })
    }
}

impl TTSRequestBuilder for SiliconFlowRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(text))
    }
}

/// Low-cost single-speaker backend. No retry at this layer.
pub struct SiliconFlowTTS {
    config: SiliconFlowConfig,
    req_manager: Arc<ReqManager>,
}

impl SiliconFlowTTS {
    pub fn new(config: SiliconFlowConfig, req_manager: Arc<ReqManager>) -> Self {
        Self {
            config,
            req_manager,
        }
    }

    fn request_builder(
        &self,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<SiliconFlowRequestBuilder> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration("SiliconFlow API key is not configured".to_string())
            })?;

        let model = options
            .model
            .clone()
            .unwrap_or_else(|| SILICONFLOW_DEFAULT_MODEL.to_string());
        let voice = qualified_voice(
            &model,
            &resolve_voice(speaker_id, options, &SILICONFLOW_VOICES),
        );
        let default_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(SILICONFLOW_TTS_URL);

        Ok(SiliconFlowRequestBuilder {
            url: options.endpoint(default_url).to_string(),
            api_key: api_key.to_string(),
            model,
            voice,
            speed: options.speed_factor().clamp(0.25, 4.0),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for SiliconFlowTTS {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SiliconFlow
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        let builder = self.request_builder(speaker_id, options)?;
        let response = send_request(&self.req_manager, &builder, text).await?;

        if response.body.is_empty() {
            return Err(TTSError::MalformedResponse(
                "SiliconFlow returned an empty audio body".to_string(),
            ));
        }

        info!(
            "SiliconFlow synthesis for speaker '{}' with voice {}: {} bytes",
            speaker_id,
            builder.voice,
            response.body.len()
        );
        let mime_type = response.content_type.as_deref().unwrap_or("audio/mpeg");
        normalize_audio(mime_type, response.body)
    }
}
