//! Audio decode and serialized playback.
//!
//! The live service streams synthesized speech as base64 PCM16 fragments.
//! [`pcm`] decodes one fragment into an [`AudioFrame`] of float samples;
//! [`playback`] schedules frames strictly back-to-back through an injected
//! [`AudioSink`] so fragments are never interleaved or dropped.

pub mod pcm;
pub mod playback;

pub use pcm::{AudioFrame, decode_base64_pcm16, pcm16_to_f32};
pub use playback::{AudioSink, NullSink, PlaybackQueue, PlayingStateCallback};

use thiserror::Error;

/// Errors that can occur during audio decode or playback.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Payload could not be decoded into PCM samples
    #[error("Invalid audio data: {0}")]
    InvalidData(String),

    /// The sink failed to play a frame
    #[error("Playback failed: {0}")]
    Playback(String),
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
