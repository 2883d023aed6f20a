//! Voice selection for single-speaker backends.

use super::base::SynthesisOptions;

/// A backend's default male/female voice pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePair {
    pub male: &'static str,
    pub female: &'static str,
}

/// Position-based fallback: the first configured speaker gets the male
/// default, every other speaker the female default.
///
/// This is an ordering rule only; nothing is inferred from the speaker.
pub fn default_voice_for_speaker_index(index: usize, pair: &VoicePair) -> &'static str {
    if index == 0 { pair.male } else { pair.female }
}

/// Position of `speaker_id` among the configured speakers.
///
/// With nothing configured the speaker counts as first. A speaker missing from
/// a non-empty configuration counts as a later speaker.
pub fn speaker_index(speaker_id: &str, options: &SynthesisOptions) -> usize {
    let speakers = options.configured_speakers();
    if speakers.is_empty() {
        return 0;
    }
    speakers
        .iter()
        .position(|s| *s == speaker_id)
        .unwrap_or(speakers.len())
}

/// Explicit voice from `voices_by_speaker`, else the position-based default.
pub fn resolve_voice(speaker_id: &str, options: &SynthesisOptions, pair: &VoicePair) -> String {
    match options.voice_for(speaker_id) {
        Some(voice) => voice.to_string(),
        None => {
            default_voice_for_speaker_index(speaker_index(speaker_id, options), pair).to_string()
        }
    }
}
