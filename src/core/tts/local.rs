//! Baseline in-process backend.
//!
//! The actual synthesis is delegated to a [`SpeechEngine`] injected at the
//! composition root. [`EspeakEngine`] drives a local `espeak-ng` binary; tests
//! substitute their own engine.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::base::{
    ProviderKind, Speed, SpeechSynthesizer, SynthesisOptions, SynthesisResult, TTSError, TTSResult,
};
use super::voices::VoicePair;
use crate::core::audio::normalize_audio;

/// Words per minute at speed 1.0.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

pub const ENGLISH_VOICES: VoicePair = VoicePair {
    male: "en-us+m3",
    female: "en-us+f3",
};

pub const CHINESE_VOICES: VoicePair = VoicePair {
    male: "cmn+m3",
    female: "cmn+f3",
};

/// Default voice pair for a language hint; unknown languages use English.
pub fn voices_for_language(language: Option<&str>) -> &'static VoicePair {
    let primary = language
        .map(|l| l.trim().to_lowercase())
        .and_then(|l| l.split(['-', '_']).next().map(str::to_string));
    match primary.as_deref() {
        Some("zh") | Some("cmn") => &CHINESE_VOICES,
        _ => &ENGLISH_VOICES,
    }
}

/// One request to the local engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub text: String,
    pub voice: String,
    pub speed: Option<Speed>,
}

/// Raw engine output before container normalization.
#[derive(Debug, Clone)]
pub struct EngineAudio {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn render(&self, request: &EngineRequest) -> TTSResult<EngineAudio>;
}

/// `espeak-ng --stdout`, which writes a complete WAV file.
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    binary: String,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

impl EspeakEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn words_per_minute(speed: Option<&Speed>) -> u32 {
        let factor = speed.and_then(Speed::as_factor).unwrap_or(1.0);
        (BASE_WORDS_PER_MINUTE * factor).round().clamp(80.0, 450.0) as u32
    }
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    async fn render(&self, request: &EngineRequest) -> TTSResult<EngineAudio> {
        let wpm = Self::words_per_minute(request.speed.as_ref());
        debug!(
            "Running {} with voice {} at {} wpm",
            self.binary, request.voice, wpm
        );

        // Text goes through stdin so a leading '-' is never read as a flag.
        let mut child = tokio::process::Command::new(&self.binary)
            .args(["--stdout", "--stdin", "-v", &request.voice, "-s", &wpm.to_string()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TTSError::InvalidConfiguration(format!(
                    "Failed to run {}: {e}. Make sure it is installed.",
                    self.binary
                ))
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            TTSError::AudioGenerationFailed(format!("{} stdin unavailable", self.binary))
        })?;
        let text = request.text.clone();
        let feed = async move {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| {
            TTSError::AudioGenerationFailed(format!("{} failed: {e}", self.binary))
        })?;
        if let Err(e) = fed {
            warn!("Could not write text to {}: {e}", self.binary);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TTSError::AudioGenerationFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(EngineAudio {
            mime_type: "audio/wav".to_string(),
            data: output.stdout,
        })
    }
}

/// Single-speaker local backend. No retry; failures surface to the caller.
pub struct LocalTTS {
    engine: Option<Arc<dyn SpeechEngine>>,
    default_language: Option<String>,
}

impl LocalTTS {
    pub fn new(engine: Option<Arc<dyn SpeechEngine>>, default_language: Option<String>) -> Self {
        Self {
            engine,
            default_language,
        }
    }

    /// Voice for `speaker_id`: explicit mapping, else the male default for
    /// the first configured speaker and the female default for the rest.
    pub fn voice_for(&self, speaker_id: &str, options: &SynthesisOptions) -> String {
        let language = options
            .language
            .as_deref()
            .or(self.default_language.as_deref());
        super::voices::resolve_voice(speaker_id, options, voices_for_language(language))
    }
}

#[async_trait]
impl SpeechSynthesizer for LocalTTS {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        let engine = self.engine.as_ref().ok_or_else(|| {
            TTSError::InvalidConfiguration("No local speech engine configured".to_string())
        })?;

        let request = EngineRequest {
            text: text.to_string(),
            voice: self.voice_for(speaker_id, options),
            speed: options.speed.clone(),
        };

        let audio = engine.render(&request).await?;
        if audio.data.is_empty() {
            return Err(TTSError::AudioGenerationFailed(
                "Local engine produced no audio".to_string(),
            ));
        }

        info!(
            "Local synthesis for speaker '{}' with voice {}: {} bytes",
            speaker_id,
            request.voice,
            audio.data.len()
        );
        normalize_audio(&audio.mime_type, audio.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::SpeakerVoice;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEngine {
        requests: Mutex<Vec<EngineRequest>>,
    }

    #[async_trait]
    impl SpeechEngine for RecordingEngine {
        async fn render(&self, request: &EngineRequest) -> TTSResult<EngineAudio> {
            self.requests.lock().push(request.clone());
            Ok(EngineAudio {
                mime_type: "audio/L16;rate=22050".to_string(),
                data: vec![0u8; 100],
            })
        }
    }

    #[tokio::test]
    async fn test_synthesize_wraps_engine_pcm() {
        let engine = Arc::new(RecordingEngine::default());
        let tts = LocalTTS::new(Some(engine.clone()), None);

        let options = SynthesisOptions {
            speed: Some(Speed::Text("+10%".to_string())),
            ..Default::default()
        };
        let result = tts.synthesize("Hello there", "host", &options).await.unwrap();

        assert_eq!(result.mime_type, "audio/wav");
        assert_eq!(result.audio.len(), 144);

        let requests = engine.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, "Hello there");
        assert_eq!(requests[0].voice, "en-us+m3");
        assert_eq!(requests[0].speed, Some(Speed::Text("+10%".to_string())));
    }

    #[tokio::test]
    async fn test_voice_selection_by_language_and_position() {
        let engine = Arc::new(RecordingEngine::default());
        let tts = LocalTTS::new(Some(engine.clone()), Some("zh-CN".to_string()));

        let options = SynthesisOptions {
            voices_by_speaker: vec![
                SpeakerVoice::new("host", ""),
                SpeakerVoice::new("guest", ""),
                SpeakerVoice::new("expert", "custom-voice"),
            ],
            ..Default::default()
        };
        assert_eq!(tts.voice_for("host", &options), "cmn+m3");
        assert_eq!(tts.voice_for("guest", &options), "cmn+f3");
        assert_eq!(tts.voice_for("expert", &options), "custom-voice");

        let english = SynthesisOptions {
            language: Some("en".to_string()),
            ..options
        };
        assert_eq!(tts.voice_for("guest", &english), "en-us+f3");
    }

    #[tokio::test]
    async fn test_missing_engine_is_configuration_error() {
        let tts = LocalTTS::new(None, None);
        let result = tts
            .synthesize("Hello", "host", &SynthesisOptions::default())
            .await;
        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_local_backend_rejects_scripts() {
        let tts = LocalTTS::new(Some(Arc::new(RecordingEngine::default())), None);
        let result = tts
            .synthesize_script(&["A: hi".to_string()], &SynthesisOptions::default())
            .await;
        assert!(matches!(result, Err(TTSError::UnsupportedOperation(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_espeak_text_is_fed_through_stdin() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let script = temp_dir.path().join("fake-espeak");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor arg in \"$@\"; do printf 'ARG[%s]\\n' \"$arg\"; done\nprintf 'STDIN['\ncat\nprintf ']'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = EspeakEngine::new(script.to_string_lossy());
        let audio = engine
            .render(&EngineRequest {
                text: "-q is how you say quiet".to_string(),
                voice: "en-us+m3".to_string(),
                speed: None,
            })
            .await
            .unwrap();

        let output = String::from_utf8(audio.data).unwrap();
        assert_eq!(
            output,
            "ARG[--stdout]\nARG[--stdin]\nARG[-v]\nARG[en-us+m3]\nARG[-s]\nARG[175]\n\
             STDIN[-q is how you say quiet]"
        );
    }

    #[tokio::test]
    async fn test_espeak_missing_binary_is_configuration_error() {
        let engine = EspeakEngine::new("/nonexistent/espeak-ng");
        let result = engine
            .render(&EngineRequest {
                text: "Hello".to_string(),
                voice: "en-us+m3".to_string(),
                speed: None,
            })
            .await;
        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_words_per_minute() {
        assert_eq!(EspeakEngine::words_per_minute(None), 175);
        assert_eq!(
            EspeakEngine::words_per_minute(Some(&Speed::Numeric(2.0))),
            350
        );
        assert_eq!(
            EspeakEngine::words_per_minute(Some(&Speed::Numeric(10.0))),
            450
        );
    }

    #[test]
    fn test_voices_for_language() {
        assert_eq!(voices_for_language(None), &ENGLISH_VOICES);
        assert_eq!(voices_for_language(Some("zh")), &CHINESE_VOICES);
        assert_eq!(voices_for_language(Some("ZH_tw")), &CHINESE_VOICES);
        assert_eq!(voices_for_language(Some("fr")), &ENGLISH_VOICES);
    }
}
