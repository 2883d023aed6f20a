//! Backend selection.
//!
//! [`TtsDispatcher`] owns one client per [`ProviderKind`] and forwards each
//! call to the one named by [`SynthesisOptions::provider`]. All clients share
//! a single [`ReqManager`]; the MiniMax client additionally holds the
//! process-wide [`RateLimiter`].

use std::sync::Arc;

use tracing::{debug, info};

use super::base::{
    ProviderKind, SpeechSynthesizer, SynthesisOptions, SynthesisResult, TTSError, TTSResult,
};
use super::gemini::GeminiTTS;
use super::local::{EspeakEngine, LocalTTS, SpeechEngine};
use super::minimax::{MiniMaxTTS, RATE_LIMIT_SAFETY_MARGIN};
use super::siliconflow::SiliconFlowTTS;
use crate::config::TtsServiceConfig;
use crate::core::retry::{Clock, RateLimiter, TokioClock};
use crate::utils::req_manager::ReqManager;

pub struct TtsDispatcher {
    local: LocalTTS,
    minimax: MiniMaxTTS,
    siliconflow: SiliconFlowTTS,
    gemini: GeminiTTS,
    default_provider: ProviderKind,
    req_manager: Arc<ReqManager>,
}

impl TtsDispatcher {
    /// Build every backend from configuration, using espeak-ng for the local
    /// engine and the tokio clock.
    pub fn from_config(config: &TtsServiceConfig) -> TTSResult<Self> {
        let engine: Option<Arc<dyn SpeechEngine>> = if config.local_engine_enabled {
            Some(Arc::new(EspeakEngine::new(config.espeak_binary.clone())))
        } else {
            None
        };
        Self::with_components(config, engine, Arc::new(TokioClock))
    }

    /// Build every backend with an explicit local engine and clock.
    pub fn with_components(
        config: &TtsServiceConfig,
        engine: Option<Arc<dyn SpeechEngine>>,
        clock: Arc<dyn Clock>,
    ) -> TTSResult<Self> {
        let req_manager = Arc::new(ReqManager::with_config(config.req_manager_config())?);
        let rate_limiter = Arc::new(RateLimiter::from_rpm(
            config.minimax_rpm,
            RATE_LIMIT_SAFETY_MARGIN,
            clock.clone(),
        )?);

        let dispatcher = Self {
            local: LocalTTS::new(engine, config.default_language.clone()),
            minimax: MiniMaxTTS::new(
                config.minimax_config(),
                req_manager.clone(),
                rate_limiter,
                clock.clone(),
            ),
            siliconflow: SiliconFlowTTS::new(config.siliconflow_config(), req_manager.clone()),
            gemini: GeminiTTS::new(config.gemini_config(), req_manager.clone(), clock)?,
            default_provider: config.default_provider,
            req_manager,
        };

        info!(
            "TTS dispatcher ready (default provider: {})",
            dispatcher.default_provider
        );
        Ok(dispatcher)
    }

    pub fn default_provider(&self) -> ProviderKind {
        self.default_provider
    }

    pub fn req_manager(&self) -> &Arc<ReqManager> {
        &self.req_manager
    }

    pub fn client(&self, kind: ProviderKind) -> &dyn SpeechSynthesizer {
        match kind {
            ProviderKind::Local => &self.local,
            ProviderKind::MiniMax => &self.minimax,
            ProviderKind::SiliconFlow => &self.siliconflow,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    /// Backend for single-line calls.
    pub fn resolve_kind(&self, options: &SynthesisOptions) -> ProviderKind {
        options.provider.unwrap_or(self.default_provider)
    }

    /// Backend for script calls: the requested one, else the default when it
    /// handles scripts, else Gemini.
    pub fn resolve_script_kind(&self, options: &SynthesisOptions) -> ProviderKind {
        match options.provider {
            Some(kind) => kind,
            None if self.default_provider.supports_multi_speaker() => self.default_provider,
            None => ProviderKind::Gemini,
        }
    }

    /// Synthesize one line spoken by `speaker_id`.
    ///
    /// Routing a line to a script-only backend fails with
    /// [`TTSError::UnsupportedOperation`] before any I/O.
    pub async fn synthesize(
        &self,
        text: &str,
        speaker_id: &str,
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        if text.trim().is_empty() {
            return Err(TTSError::InvalidInput("Text must not be empty".to_string()));
        }

        let kind = self.resolve_kind(options);
        debug!(
            "Dispatching line for speaker '{}' to {} ({} chars)",
            speaker_id,
            kind,
            text.len()
        );
        self.client(kind).synthesize(text, speaker_id, options).await
    }

    /// Synthesize a whole multi-speaker script in one call.
    pub async fn synthesize_script(
        &self,
        lines: &[String],
        options: &SynthesisOptions,
    ) -> TTSResult<SynthesisResult> {
        let kind = self.resolve_script_kind(options);
        debug!("Dispatching script of {} lines to {}", lines.len(), kind);
        self.client(kind).synthesize_script(lines, options).await
    }

    /// Provider details for every backend.
    pub fn provider_info(&self) -> serde_json::Value {
        let providers: Vec<serde_json::Value> = ProviderKind::ALL
            .iter()
            .map(|kind| self.client(*kind).get_provider_info())
            .collect();
        serde_json::json!({
            "default_provider": self.default_provider.as_str(),
            "providers": providers,
        })
    }
}
