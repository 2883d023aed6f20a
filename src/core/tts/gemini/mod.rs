//! Gemini multi-speaker speech generation.
//!
//! # Architecture
//!
//! - **config**: endpoint/model constants and [`GeminiTTSConfig`] (credentials, retry policy)
//! - **provider**: [`GeminiRequestBuilder`] for the `generateContent` body and the
//!   [`GeminiTTS`] client that retries, decodes and containerizes the audio
//!
//! # Usage
//!
//! ```rust,ignore
//! use podcast_tts::core::tts::gemini::{GeminiTTS, GeminiTTSConfig};
//! use podcast_tts::core::tts::{SpeakerVoice, SpeechSynthesizer, SynthesisOptions};
//!
//! let gemini = GeminiTTS::new(config, req_manager, clock)?;
//! let options = SynthesisOptions {
//!     speaker_roster: vec![
//!         SpeakerVoice::new("Alice", "Kore"),
//!         SpeakerVoice::new("Bob", "Puck"),
//!     ],
//!     ..Default::default()
//! };
//! let lines = vec!["Alice: Welcome back.".to_string(), "Bob: Glad to be here.".to_string()];
//! let episode = gemini.synthesize_script(&lines, &options).await?;
//! ```

mod config;
mod provider;

pub use config::{GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL, GEMINI_MAX_SPEAKERS, GeminiTTSConfig};
pub use provider::{GeminiRequestBuilder, GeminiTTS};
