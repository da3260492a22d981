//! PCM16 fragment decoding.
//!
//! Model audio arrives as base64-encoded PCM 16-bit signed little-endian
//! mono at 24kHz. Decoding maps each sample pair to a float in [-1.0, 1.0).

use base64::prelude::*;

use super::{AudioError, AudioResult};
use crate::live::gemini::GEMINI_LIVE_SAMPLE_RATE;

/// Scale factor for converting i16 PCM samples to f32.
pub const PCM_TO_FLOAT_SCALE: f32 = 1.0 / 32768.0;

/// One decoded playback unit: float samples at a fixed sample rate.
///
/// A frame is produced from exactly one inbound PCM fragment and is owned by
/// the playback queue from decode until playback completion.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Interleaved mono samples in [-1.0, 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Decode a base64 PCM16 fragment at the live output sample rate.
    pub fn from_base64(data: &str) -> AudioResult<Self> {
        let samples = decode_base64_pcm16(data)?;
        Ok(Self {
            samples,
            sample_rate: GEMINI_LIVE_SAMPLE_RATE,
        })
    }

    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration of the frame.
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Decode a base64 PCM16 payload into float samples.
pub fn decode_base64_pcm16(data: &str) -> AudioResult<Vec<f32>> {
    let bytes = BASE64_STANDARD
        .decode(data)
        .map_err(|err| AudioError::InvalidData(err.to_string()))?;
    Ok(pcm16_to_f32(&bytes))
}

/// Convert PCM 16-bit little-endian bytes to float samples.
///
/// An odd trailing byte is ignored rather than rejected; fragment boundaries
/// from the service are sample-aligned in practice.
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    let mut samples = Vec::with_capacity(bytes.len() / 2);
    for chunk in bytes.chunks_exact(2) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]) as f32 * PCM_TO_FLOAT_SCALE;
        samples.push(sample);
    }
    samples
}
