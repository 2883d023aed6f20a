//! MiniMax T2A v2 backend.
//!
//! MiniMax enforces a hard requests-per-minute ceiling and reports rate limits
//! in-band through `base_resp`, often with HTTP 200. Every attempt, retries
//! included, passes through the shared [`RateLimiter`] first.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::base::{
    ProviderKind, SpeechSynthesizer, SynthesisOptions, SynthesisResult, TTSError, TTSResult,
};
use super::provider::{TTSRequestBuilder, send_request};
use super::voices::{VoicePair, resolve_voice};
use crate::core::audio::normalize_audio;
use crate::core::retry::{Clock, RateLimiter};
use crate::utils::req_manager::ReqManager;

pub const MINIMAX_TTS_URL: &str = "https://api.minimax.io/v1/t2a_v2";
pub const MINIMAX_DEFAULT_MODEL: &str = "speech-02-hd";

pub const MINIMAX_VOICES: VoicePair = VoicePair {
    male: "male-qn-qingse",
    female: "female-shaonv",
};

pub const DEFAULT_MINIMAX_RPM: u32 = 20;
/// Added on top of `60000 / rpm` so bursts stay under the ceiling.
pub const RATE_LIMIT_SAFETY_MARGIN: Duration = Duration::from_millis(500);
pub const MAX_RATE_LIMIT_ATTEMPTS: u32 = 3;
/// Multiplied by the attempt number between rate-limited retries.
pub const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_secs(5);

const SAMPLE_RATE: u32 = 32_000;
const BITRATE: u32 = 128_000;

/// Whether a failure is MiniMax's in-band rate-limit signal.
///
/// Matches on message text ("rate limit" or "rpm"), not status.
pub fn is_rate_limit_error(error: &TTSError) -> bool {
    let message = error.to_string().to_lowercase();
    message.contains("rate limit") || message.contains("rpm")
}

#[derive(Debug, Clone, Default)]
pub struct MiniMaxConfig {
    pub api_key: Option<String>,
    pub group_id: Option<String>,
    /// Endpoint used when the call does not override `api_url`
    pub base_url: Option<String>,
    pub default_language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct VoiceSetting {
    voice_id: String,
    speed: f32,
    vol: f32,
    pitch: i32,
}

#[derive(Debug, Clone, Serialize)]
struct AudioSetting {
    sample_rate: u32,
    bitrate: u32,
    format: &'static str,
    channel: u8,
}

/// One fully-resolved MiniMax request.
#[derive(Debug, Clone)]
pub struct MiniMaxRequestBuilder {
    url: String,
    api_key: String,
    group_id: Option<String>,
    model: String,
    voice_setting: VoiceSetting,
    language_boost: String,
}

impl MiniMaxRequestBuilder {
    fn build_request_body(&self, text: &str) -> serde_json::Value {
        let audio_setting = AudioSetting {
            sample_rate: SAMPLE_RATE,
            bitrate: BITRATE,
            format: "mp3",
            channel: 1,
        };
        serde_json::json!({
            "model": self.model,
            "text": text,
            "stream": false,
            "voice_setting": self.voice_setting,
            "audio_setting": audio_setting,
            "language_boost": self.language_boost,
        })
    }
}

impl TTSRequestBuilder for MiniMaxRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        let mut request = client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(group_id) = &self.group_id {
            request = request.query(&[("GroupId", group_id)]);
        }
        request.json(&self.build_request_body(text))
    }
}

#[derive(Debug, Deserialize)]
struct MiniMaxResponse {
    data: Option<MiniMaxData>,
    extra_info: Option<MiniMaxExtraInfo>,
    base_resp: Option<MiniMaxBaseResp>,
}

#[derive(Debug, Deserialize)]
struct MiniMaxData {
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MiniMaxExtraInfo {
    audio_format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MiniMaxBaseResp {
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

fn language_boost(language: Option<&str>) -> &'static str {
    match language.map(|l| l.trim().to_lowercase()) {
        Some(l) if l.starts_with("zh") => "Chinese",
        Some(l) if l.starts_with("en") => "English",
        _ => "auto",
    }
}

fn mime_for_format(format: Option<&str>) -> &'static str {
    match format.map(str::to_lowercase).as_deref() {
        Some("wav") => "audio/wav",
        Some("pcm") => "audio/L16;rate=32000",
        _ => "audio/mpeg",
    }
}

/// Decode a MiniMax JSON body into audio bytes and their MIME type.
fn parse_response(body: &[u8]) -> TTSResult<(Vec<u8>, &'static str)> {
    let response: MiniMaxResponse = serde_json::from_slice(body).map_err(|e| {
        TTSError::MalformedResponse(format!("Failed to parse MiniMax response: {e}"))
    })?;

    if let Some(base) = &response.base_resp
        && base.status_code != 0
    {
        return Err(TTSError::ProviderError {
            code: Some(base.status_code.to_string()),
            message: base.status_msg.clone(),
        });
    }

    let audio_hex = response
        .data
        .and_then(|d| d.audio)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            TTSError::MalformedResponse("MiniMax response carried no audio".to_string())
        })?;

    let audio = hex::decode(audio_hex.trim())
        .map_err(|e| TTSError::MalformedResponse(format!("Failed to decode hex audio: {e}")))?;

    let mime = mime_for_format(
        response
            .extra_info
            .as_ref()
            .and_then(|i| i.audio_format.as_deref()),
    );
    Ok((audio, mime))
}

pub struct MiniMaxTTS {
    config: MiniMaxConfig,
    req_manager: Arc<ReqManager>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl MiniMaxTTS {
    pub fn new(
        config: MiniMaxConfig,
        req_manager: Arc<ReqManager>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            req_manager,
            rate_limiter,
            clock,
        }
    }

    fn request_builder(
        &self,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<MiniMaxRequestBuilder> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration("MiniMax API key is not configured".to_string())
            })?;

        let default_url = self.config.base_url.as_deref().unwrap_or(MINIMAX_TTS_URL);
        let language = options
            .language
            .as_deref()
            .or(self.config.default_language.as_deref());

        Ok(MiniMaxRequestBuilder {
            url: options.endpoint(default_url).to_string(),
            api_key: api_key.to_string(),
            group_id: self.config.group_id.clone().filter(|g| !g.is_empty()),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| MINIMAX_DEFAULT_MODEL.to_string()),
            voice_setting: VoiceSetting {
                voice_id: resolve_voice(speaker_id, options, &MINIMAX_VOICES),
                speed: options.speed_factor().clamp(0.5, 2.0),
                vol: 1.0,
                pitch: 0,
            },
            language_boost: language_boost(language).to_string(),
        })
    }

    async fn attempt(&self, builder: &MiniMaxRequestBuilder, text: &str) -> TTSResult<SynthesisResult> {
        let response = send_request(&self.req_manager, builder, text).await?;
        let (audio, mime) = parse_response(&response.body)?;
        normalize_audio(mime, audio)
    }
}

#[async_trait]
impl SpeechSynthesizer for MiniMaxTTS {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MiniMax
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        let builder = self.request_builder(speaker_id, options)?;
        let mut attempt = 1;

        loop {
            self.rate_limiter.acquire().await;

            match self.attempt(&builder, text).await {
                Ok(result) => {
                    info!(
                        "MiniMax synthesis for speaker '{}' with voice {}: {} bytes",
                        speaker_id,
                        builder.voice_setting.voice_id,
                        result.len()
                    );
                    return Ok(result);
                }
                Err(e) if is_rate_limit_error(&e) && attempt < MAX_RATE_LIMIT_ATTEMPTS => {
                    let delay = RATE_LIMIT_BASE_DELAY * attempt;
                    warn!(
                        "MiniMax rate limited on attempt {attempt}/{MAX_RATE_LIMIT_ATTEMPTS}, retrying in {}ms: {e}",
                        delay.as_millis()
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::{SpeakerVoice, Speed};

    fn tts(config: MiniMaxConfig) -> MiniMaxTTS {
        let clock: Arc<dyn Clock> = Arc::new(crate::core::retry::ManualClock::new());
        let limiter = RateLimiter::from_rpm(
            DEFAULT_MINIMAX_RPM,
            RATE_LIMIT_SAFETY_MARGIN,
            clock.clone(),
        )
        .unwrap();
        MiniMaxTTS::new(
            config,
            Arc::new(ReqManager::new(1).unwrap()),
            Arc::new(limiter),
            clock,
        )
    }

    #[test]
    fn test_rate_limit_detection() {
        let err = TTSError::ProviderError {
            code: Some("1002".to_string()),
            message: "rate limit exceeded(RPM)".to_string(),
        };
        assert!(is_rate_limit_error(&err));

        let err = TTSError::Http {
            status: 200,
            code: None,
            message: "RPM exceeded".to_string(),
        };
        assert!(is_rate_limit_error(&err));

        let err = TTSError::ProviderError {
            code: Some("1004".to_string()),
            message: "authentication failed".to_string(),
        };
        assert!(!is_rate_limit_error(&err));
    }

    #[test]
    fn test_parse_response_hex_audio() {
        let body = br#"{"data":{"audio":"494433","status":2},"extra_info":{"audio_format":"mp3"},"base_resp":{"status_code":0,"status_msg":"success"}}"#;
        let (audio, mime) = parse_response(body).unwrap();
        assert_eq!(audio, b"ID3");
        assert_eq!(mime, "audio/mpeg");
    }

    #[test]
    fn test_parse_response_in_band_error() {
        let body = br#"{"base_resp":{"status_code":1002,"status_msg":"rate limit exceeded(RPM)"}}"#;
        match parse_response(body) {
            Err(TTSError::ProviderError { code, message }) => {
                assert_eq!(code.as_deref(), Some("1002"));
                assert!(message.contains("RPM"));
            }
            other => panic!("Expected ProviderError, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_rejects_missing_or_bad_audio() {
        let body = br#"{"data":{},"base_resp":{"status_code":0,"status_msg":"success"}}"#;
        assert!(matches!(
            parse_response(body),
            Err(TTSError::MalformedResponse(_))
        ));

        let body = br#"{"data":{"audio":"zz"},"base_resp":{"status_code":0}}"#;
        assert!(matches!(
            parse_response(body),
            Err(TTSError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let tts = tts(MiniMaxConfig {
            api_key: Some("key".to_string()),
            group_id: Some("g-1".to_string()),
            ..Default::default()
        });
        let options = SynthesisOptions {
            language: Some("zh".to_string()),
            speed: Some(Speed::Numeric(3.0)),
            voices_by_speaker: vec![SpeakerVoice::new("host", ""), SpeakerVoice::new("guest", "")],
            ..Default::default()
        };

        let builder = tts.request_builder("guest", &options).unwrap();
        let body = builder.build_request_body("hello");

        assert_eq!(body["model"], "speech-02-hd");
        assert_eq!(body["text"], "hello");
        assert_eq!(body["stream"], false);
        assert_eq!(body["voice_setting"]["voice_id"], "female-shaonv");
        assert_eq!(body["voice_setting"]["speed"], 2.0);
        assert_eq!(body["audio_setting"]["format"], "mp3");
        assert_eq!(body["audio_setting"]["sample_rate"], 32000);
        assert_eq!(body["language_boost"], "Chinese");
        assert_eq!(builder.url, MINIMAX_TTS_URL);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_io() {
        let tts = tts(MiniMaxConfig::default());
        let result = tts
            .synthesize("hello", "host", &SynthesisOptions::default())
            .await;
        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
        assert!(tts.rate_limiter.last_request_at().is_none());
    }
}
