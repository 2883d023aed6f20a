use crate::core::tts::SpeakerVoice;

/// Parse a boolean value from a string, supporting multiple formats
///
/// Accepts: "true", "false", "1", "0", "yes", "no" (case insensitive)
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse an ordered speaker list such as `"Alice=Kore, Bob=Puck"`.
///
/// A bare name (`"host"`) yields an entry without a voice, which leaves the
/// backend's position-based default in charge.
pub fn parse_speaker_list(s: &str) -> Result<Vec<SpeakerVoice>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (speaker, voice) = entry.split_once('=').unwrap_or((entry, ""));
            let speaker = speaker.trim();
            if speaker.is_empty() {
                return Err(format!("Speaker entry '{entry}' has no speaker name"));
            }
            Ok(SpeakerVoice::new(speaker, voice.trim()))
        })
        .collect()
}
