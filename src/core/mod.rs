pub mod audio;
pub mod retry;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio::normalize_audio;
pub use retry::{ClassifiedError, Clock, ManualClock, RateLimiter, RetryPolicy, TokioClock};
pub use tts::{
    ProviderKind, SpeakerVoice, Speed, SpeechEngine, SpeechSynthesizer, SynthesisOptions,
    SynthesisResult, TTSError, TTSResult, TtsDispatcher, get_tts_provider_urls,
};
