//! # Gemini Integration Tests
//!
//! Exercises the multi-speaker backend end to end against a `wiremock`
//! `generateContent` endpoint: prompt assembly, the backoff retry loop,
//! malformed-response handling and PCM to WAV normalization.
//!
//! A `ManualClock` replaces the tokio timer, so retry delays are recorded
//! rather than slept.
//!
//! ```bash
//! cargo test --test gemini_test
//! ```

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use podcast_tts::core::retry::{MIN_RETRY_DELAY, ManualClock};
use podcast_tts::{
    ProviderKind, SpeakerVoice, SynthesisOptions, TTSError, TtsDispatcher, TtsServiceConfig,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";

// =============================================================================
// Helpers
// =============================================================================

fn config_for(server: &MockServer) -> TtsServiceConfig {
    TtsServiceConfig {
        default_provider: ProviderKind::Gemini,
        gemini_api_key: Some("gm-test-key".to_string()),
        gemini_url: Some(server.uri()),
        ..Default::default()
    }
}

fn dispatcher_with_clock(config: &TtsServiceConfig) -> (TtsDispatcher, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let dispatcher = TtsDispatcher::with_components(config, None, clock.clone())
        .expect("dispatcher should build");
    (dispatcher, clock)
}

fn two_speaker_options() -> SynthesisOptions {
    SynthesisOptions {
        speaker_roster: vec![
            SpeakerVoice::new("Alice", "Kore"),
            SpeakerVoice::new("Bob", "Puck"),
        ],
        ..Default::default()
    }
}

fn script() -> Vec<String> {
    vec![
        "Alice: Welcome back to the show.".to_string(),
        "   ".to_string(),
        "Narrator: this line is dropped".to_string(),
        "Bob: Glad to be here.".to_string(),
    ]
}

fn pcm_response(samples: usize) -> ResponseTemplate {
    let pcm: Vec<u8> = (0..samples)
        .flat_map(|i| ((i as i16).wrapping_mul(31)).to_le_bytes())
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {
                "parts": [{
                    "inlineData": {
                        "mimeType": "audio/L16;codec=pcm;rate=24000",
                        "data": base64::engine::general_purpose::STANDARD.encode(&pcm)
                    }
                }]
            },
            "finishReason": "STOP"
        }]
    }))
}

// =============================================================================
// Success path
// =============================================================================

#[tokio::test]
async fn test_gemini_script_produces_readable_wav() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "gm-test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{
                "text": "TTS the following conversation between Alice and Bob:\nAlice: Welcome back to the show.\nBob: Glad to be here."
            }] }],
            "generationConfig": { "responseModalities": ["AUDIO"] }
        })))
        .respond_with(pcm_response(240))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, clock) = dispatcher_with_clock(&config_for(&server));
    let result = dispatcher
        .synthesize_script(&script(), &two_speaker_options())
        .await
        .expect("script synthesis should succeed");

    assert_eq!(result.mime_type, "audio/wav");
    assert_eq!(result.extension, "wav");
    assert_eq!(result.len(), 44 + 480);
    assert!(clock.sleeps().is_empty());

    let reader = hound::WavReader::new(Cursor::new(result.audio)).expect("valid WAV");
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 240);
}

#[tokio::test]
async fn test_gemini_single_speaker_roster_uses_voice_config() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({
            "generationConfig": { "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } }
            } }
        })))
        .respond_with(pcm_response(10))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, _clock) = dispatcher_with_clock(&config_for(&server));
    let options = SynthesisOptions {
        speaker_roster: vec![SpeakerVoice::new("Alice", "Kore")],
        ..Default::default()
    };
    dispatcher
        .synthesize_script(&["Alice: Solo episode.".to_string()], &options)
        .await
        .expect("script synthesis should succeed");
}

// =============================================================================
// Retry behaviour
// =============================================================================

#[tokio::test]
async fn test_gemini_retries_transient_failures_up_to_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
        })))
        .expect(5)
        .mount(&server)
        .await;

    let (dispatcher, clock) = dispatcher_with_clock(&config_for(&server));
    let result = dispatcher
        .synthesize_script(&script(), &two_speaker_options())
        .await;

    match result {
        Err(TTSError::Classified {
            attempts, error, ..
        }) => {
            assert_eq!(attempts, 5);
            assert_eq!(error.status, Some(503));
            assert!(error.retryable);
        }
        other => panic!("Expected Classified error, got: {:?}", other),
    }

    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 4);
    assert!(sleeps.iter().all(|d| *d >= MIN_RETRY_DELAY));
    assert!(sleeps.iter().all(|d| *d <= Duration::from_secs(30)));
}

#[tokio::test]
async fn test_gemini_recovers_after_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Resource exhausted"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(pcm_response(32))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, clock) = dispatcher_with_clock(&config_for(&server));
    let result = dispatcher
        .synthesize_script(&script(), &two_speaker_options())
        .await
        .expect("third attempt should succeed");

    assert_eq!(result.len(), 44 + 64);
    assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn test_gemini_configured_attempt_bound() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = TtsServiceConfig {
        gemini_max_attempts: 2,
        ..config_for(&server)
    };
    let (dispatcher, _clock) = dispatcher_with_clock(&config);
    let result = dispatcher
        .synthesize_script(&script(), &two_speaker_options())
        .await;

    assert!(matches!(result, Err(TTSError::Classified { attempts: 2, .. })));
}

#[tokio::test]
async fn test_gemini_fatal_status_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Invalid voice name", "status": "INVALID_ARGUMENT" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, clock) = dispatcher_with_clock(&config_for(&server));
    let err = dispatcher
        .synthesize_script(&script(), &two_speaker_options())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.error_code(), Some("INVALID_ARGUMENT"));
    assert!(clock.sleeps().is_empty());
}

// =============================================================================
// Malformed responses and configuration errors
// =============================================================================

#[tokio::test]
async fn test_gemini_missing_inline_data_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot read that aloud." }] },
                "finishReason": "OTHER"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, clock) = dispatcher_with_clock(&config_for(&server));
    let err = dispatcher
        .synthesize_script(&script(), &two_speaker_options())
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), TTSError::MalformedResponse(_)));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_gemini_fully_filtered_script_fails_before_io() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(pcm_response(10))
        .expect(0)
        .mount(&server)
        .await;

    let (dispatcher, _clock) = dispatcher_with_clock(&config_for(&server));
    let lines = vec!["Narrator: nobody on the roster".to_string(), "".to_string()];
    let result = dispatcher
        .synthesize_script(&lines, &two_speaker_options())
        .await;

    assert!(matches!(result, Err(TTSError::EmptyScript(_))));
}

#[tokio::test]
async fn test_gemini_empty_roster_fails_before_io() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(pcm_response(10))
        .expect(0)
        .mount(&server)
        .await;

    let (dispatcher, _clock) = dispatcher_with_clock(&config_for(&server));
    let result = dispatcher
        .synthesize_script(&script(), &SynthesisOptions::default())
        .await;

    assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
}
