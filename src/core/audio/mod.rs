//! Audio container normalization.
//!
//! Backends return either a finished container (WAV, MP3, Ogg, WebM) or raw
//! linear PCM tagged like `audio/L16;rate=24000`. [`normalize_audio`] passes
//! containers through and wraps raw PCM in a canonical 44-byte WAV header so
//! the result is playable as-is.

pub mod mime;
pub mod wav;

pub use mime::{AudioMime, extension_for_mime};
pub use wav::{PcmFormat, WAV_HEADER_LEN, is_riff_wave, wav_header, wrap_pcm_in_wav};

use tracing::debug;

use crate::core::tts::{SynthesisResult, TTSResult};

pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Turn a backend payload into a playable [`SynthesisResult`].
pub fn normalize_audio(mime_type: &str, data: Vec<u8>) -> TTSResult<SynthesisResult> {
    let mime = AudioMime::parse(mime_type);

    if let Some(extension) = mime.container_extension() {
        return Ok(SynthesisResult {
            audio: data,
            mime_type: mime_type.trim().to_string(),
            extension: extension.to_string(),
        });
    }

    if is_riff_wave(&data) {
        debug!("Payload tagged {mime_type} already carries a RIFF header, passing through");
        return Ok(SynthesisResult {
            audio: data,
            mime_type: WAV_MIME_TYPE.to_string(),
            extension: "wav".to_string(),
        });
    }

    let format = PcmFormat::from_mime(&mime);
    debug!(
        "Wrapping {} bytes of {mime_type} as WAV ({} Hz, {} ch, {} bit)",
        data.len(),
        format.sample_rate,
        format.channels,
        format.bits_per_sample
    );

    Ok(SynthesisResult {
        audio: wrap_pcm_in_wav(&format, &data)?,
        mime_type: WAV_MIME_TYPE.to_string(),
        extension: "wav".to_string(),
    })
}
