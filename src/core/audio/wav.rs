use super::mime::AudioMime;
use crate::core::tts::{TTSError, TTSResult};

/// Size of the canonical RIFF/WAVE header.
pub const WAV_HEADER_LEN: usize = 44;

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

/// Layout of a headerless linear-PCM payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
        }
    }
}

impl PcmFormat {
    /// Read `rate=`, `channels=` and the `L<bits>` subtype, defaulting the rest.
    pub fn from_mime(mime: &AudioMime) -> Self {
        let defaults = Self::default();
        Self {
            sample_rate: mime
                .param("rate")
                .and_then(|r| r.parse::<u32>().ok())
                .filter(|r| *r > 0)
                .unwrap_or(defaults.sample_rate),
            channels: mime
                .param("channels")
                .and_then(|c| c.parse::<u16>().ok())
                .filter(|c| *c > 0)
                .unwrap_or(defaults.channels),
            bits_per_sample: mime.pcm_bits().unwrap_or(defaults.bits_per_sample),
        }
    }

    pub fn byte_rate(&self) -> u32 {
        let rate = u64::from(self.sample_rate)
            * u64::from(self.channels)
            * u64::from(self.bits_per_sample)
            / 8;
        u32::try_from(rate).unwrap_or(u32::MAX)
    }

    pub fn block_align(&self) -> u16 {
        let align = u32::from(self.channels) * u32::from(self.bits_per_sample) / 8;
        u16::try_from(align).unwrap_or(u16::MAX)
    }
}

/// Build the 44-byte RIFF/WAVE header for `data_len` bytes of PCM.
pub fn wav_header(format: &PcmFormat, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&data_len.saturating_add(36).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    // PCM
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

/// Prepend a WAV header to raw PCM.
pub fn wrap_pcm_in_wav(format: &PcmFormat, pcm: &[u8]) -> TTSResult<Vec<u8>> {
    let data_len = u32::try_from(pcm.len())
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or_else(|| {
            TTSError::AudioGenerationFailed(format!(
                "PCM payload of {} bytes is too large for a WAV container",
                pcm.len()
            ))
        })?;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    wav.extend_from_slice(&wav_header(format, data_len));
    wav.extend_from_slice(pcm);
    Ok(wav)
}

/// Whether `bytes` already start with a RIFF/WAVE signature.
pub fn is_riff_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}
