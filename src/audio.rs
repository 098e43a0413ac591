//! Helpers for turning synthesized raw PCM into something a browser can play.
//!
//! The speech upstream returns 16-bit little-endian PCM declared as
//! `audio/L16;rate=24000`. Standard decoders need a RIFF/WAVE header in front
//! of those samples.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::models::chat::InlineAudio;

pub const WAV_MIME_TYPE: &str = "audio/wav";
const WAV_HEADER_LEN: usize = 44;
const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("PCM format does not fit a WAV header: {0:?}")]
    UnsupportedFormat(PcmFormat),
    #[error("PCM payload of {0} bytes is too large for a WAV container")]
    TooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Parses `audio/L16;rate=24000[;channels=1]` or `audio/pcm;...`.
    /// Returns `None` for anything that is not raw PCM.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mut pieces = mime.split(';').map(str::trim);
        let essence = pieces.next()?.to_ascii_lowercase();
        let bits_per_sample = match essence.as_str() {
            "audio/l16" | "audio/pcm" => 16,
            _ => {
                return None;
            }
        };

        let mut format = PcmFormat { sample_rate: DEFAULT_SAMPLE_RATE, channels: 1, bits_per_sample };
        for param in pieces {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "rate" => {
                    format.sample_rate = value.trim().parse().ok()?;
                }
                "channels" => {
                    format.channels = value.trim().parse().ok()?;
                }
                _ => {}
            }
        }

        if format.sample_rate == 0 || format.channels == 0 || format.byte_rate().is_none() {
            return None;
        }
        Some(format)
    }

    fn block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bits_per_sample / 8)
    }

    fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(self.block_align()? as u32)
    }
}

/// Canonical 44-byte little-endian RIFF/WAVE header for `data_len` bytes of PCM.
pub fn wav_header(format: PcmFormat, data_len: u32) -> Result<[u8; WAV_HEADER_LEN], AudioError> {
    let block_align = format.block_align().ok_or(AudioError::UnsupportedFormat(format))?;
    let byte_rate = format.byte_rate().ok_or(AudioError::UnsupportedFormat(format))?;
    let riff_len = data_len.checked_add(36).ok_or(AudioError::TooLarge(data_len as usize))?;

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    Ok(header)
}

pub fn wrap_pcm_as_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, AudioError> {
    let data_len = u32::try_from(pcm.len()).map_err(|_| AudioError::TooLarge(pcm.len()))?;
    let header = wav_header(format, data_len)?;
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(pcm);
    Ok(out)
}

/// Decoded bytes plus the media type they should be served as.
/// Raw PCM gets a WAV header; any other format is returned untouched.
pub fn to_playable(audio: &InlineAudio) -> Result<(Vec<u8>, String), AudioError> {
    let bytes = STANDARD.decode(audio.data.as_bytes())?;
    match PcmFormat::from_mime(&audio.mime_type) {
        Some(format) => Ok((wrap_pcm_as_wav(&bytes, format)?, WAV_MIME_TYPE.to_string())),
        None => Ok((bytes, audio.mime_type.clone())),
    }
}

/// Same as [`to_playable`] but keeps the base64 envelope used on the wire.
pub fn wav_inline_audio(audio: &InlineAudio) -> Result<InlineAudio, AudioError> {
    let (bytes, mime_type) = to_playable(audio)?;
    Ok(InlineAudio { data: STANDARD.encode(bytes), mime_type })
}
