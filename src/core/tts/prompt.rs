//! Multi-speaker script assembly.
//!
//! A script is a list of dialogue lines of the form `Speaker: words`. Lines whose
//! tag is not in the speaker roster are dropped silently; a script that ends up
//! empty is a configuration mismatch and fails.

use tracing::debug;

use super::base::{TTSError, TTSResult};

/// Placeholder in a prompt template replaced by the roster's speaker names.
pub const SPEAKERS_PLACEHOLDER: &str = "{speakers}";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "TTS the following conversation between {speakers}:";

/// Speaker tag of a dialogue line: the trimmed text before the first `:`.
pub fn speaker_tag(line: &str) -> Option<&str> {
    line.split_once(':')
        .map(|(tag, _)| tag.trim())
        .filter(|tag| !tag.is_empty())
}

/// Trimmed, non-blank lines whose speaker tag is in `speakers`.
pub fn filter_script_lines<'a, S: AsRef<str>>(lines: &'a [S], speakers: &[&str]) -> Vec<&'a str> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .filter(|line| match speaker_tag(line) {
            Some(tag) if speakers.contains(&tag) => true,
            _ => {
                debug!("Dropping script line without a known speaker tag: '{line}'");
                false
            }
        })
        .collect()
}

/// Expand `{speakers}` in the preamble, e.g. "Alice and Bob".
pub fn render_preamble(template: &str, speakers: &[&str]) -> String {
    if template.contains(SPEAKERS_PLACEHOLDER) {
        template.replace(SPEAKERS_PLACEHOLDER, &speakers.join(" and "))
    } else {
        template.to_string()
    }
}

/// Build the exact prompt text for a multi-speaker backend.
pub fn build_script_prompt<S: AsRef<str>>(
    lines: &[S],
    speakers: &[&str],
    template: &str,
) -> TTSResult<String> {
    if speakers.is_empty() {
        return Err(TTSError::InvalidConfiguration(
            "Speaker roster is empty; multi-speaker synthesis needs at least one speaker".to_string(),
        ));
    }

    let kept = filter_script_lines(lines, speakers);
    if kept.is_empty() {
        return Err(TTSError::EmptyScript(format!(
            "none of {} line(s) matched the speaker roster [{}]",
            lines.len(),
            speakers.join(", ")
        )));
    }

    let preamble = render_preamble(template.trim(), speakers);
    let body = kept.join("\n");
    Ok(if preamble.is_empty() {
        body
    } else {
        format!("{preamble}\n{body}")
    })
}
