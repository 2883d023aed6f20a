mod base;
pub mod dispatcher;
pub mod gemini;
pub mod local;
pub mod minimax;
pub mod prompt;
pub mod provider;
pub mod siliconflow;
pub mod voices;

pub use base::{
    ProviderKind, SpeakerVoice, Speed, SpeechSynthesizer, SynthesisOptions,
    SynthesisResult, TTSError, TTSResult,
};
pub use dispatcher::TtsDispatcher;
pub use gemini::{GEMINI_BASE_URL, GeminiTTS, GeminiTTSConfig};
pub use local::{EspeakEngine, LocalTTS, SpeechEngine};
pub use minimax::{MINIMAX_TTS_URL, MiniMaxConfig, MiniMaxTTS};
pub use provider::{HttpAudioResponse, TTSRequestBuilder, http_error, send_request};
pub use siliconflow::{SILICONFLOW_TTS_URL, SiliconFlowConfig, SiliconFlowTTS};
pub use voices::{VoicePair, default_voice_for_speaker_index};
use std::collections::HashMap;

/// Returns a map of provider names to their default API endpoint URLs.
///
/// The local backend runs in-process and points at the engine binary instead.
pub fn get_tts_provider_urls() -> HashMap<String, String> {
    let mut urls = HashMap::new();
    urls.insert(
        ProviderKind::Local.to_string(),
        "local://espeak-ng".to_string(),
    );
    urls.insert(ProviderKind::MiniMax.to_string(), MINIMAX_TTS_URL.to_string());
    urls.insert(
        ProviderKind::SiliconFlow.to_string(),
        SILICONFLOW_TTS_URL.to_string(),
    );
    urls.insert(ProviderKind::Gemini.to_string(), GEMINI_BASE_URL.to_string());
    urls
}
