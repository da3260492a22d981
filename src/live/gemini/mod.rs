//! Gemini Live API module.
//!
//! This module provides bidirectional realtime streaming against the Gemini
//! Live `BidiGenerateContent` WebSocket service.
//!
//! # Features
//!
//! - Bidirectional streaming over a single WebSocket
//! - Voice (AUDIO) and text (TEXT) response modes, renegotiable at runtime
//! - Inline PCM16 speech output queued for gapless playback
//! - Control-token routing: model turns can trigger grounded web search or
//!   request a screen capture instead of surfacing text
//! - Automatic reconnection with exponential backoff
//!
//! # Audio Format
//!
//! Synthesized speech arrives as base64 PCM 16-bit signed little-endian at
//! 24kHz. Input audio chunks are tagged `audio/pcm`.
//!
//! # Example
//!
//! ```rust,ignore
//! use sotto_live::live::{GeminiLive, LiveConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LiveConfig {
//!         api_key: "AIza...".to_string(),
//!         voice_mode_enabled: true,
//!         ..Default::default()
//!     };
//!
//!     let session = GeminiLive::new(config).unwrap();
//!
//!     session.on_message(Arc::new(|text| Box::pin(async move {
//!         println!("assistant: {}", text);
//!     })));
//!
//!     session.connect().await.unwrap();
//!
//!     // Stream microphone audio
//!     session.send_audio(audio_bytes).await.unwrap();
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::GeminiLive;
pub use config::{
    AUDIO_MIME_PREFIX, DEFAULT_LIVE_MODEL, DEFAULT_TEXT_INSTRUCTION, DEFAULT_VOICE_INSTRUCTION,
    GEMINI_LIVE_SAMPLE_RATE, GEMINI_LIVE_URL, NORMAL_CLOSE_RECONNECT_DELAY_MS,
    REINITIALIZE_DELAY_MS, ResponseModality, build_ws_url, instruction_for_mode,
};
pub use messages::{ClientMessage, ContentPart, InlineData, ServerEvent, decode};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::base::{LiveConfig, SessionState};

    #[test]
    fn test_live_url() {
        assert!(GEMINI_LIVE_URL.starts_with("wss://generativelanguage.googleapis.com/ws/"));
    }

    #[test]
    fn test_sample_rate() {
        assert_eq!(GEMINI_LIVE_SAMPLE_RATE, 24000);
    }

    #[test]
    fn test_modality_for_mode() {
        assert_eq!(ResponseModality::for_voice_mode(true), ResponseModality::Audio);
        assert_eq!(ResponseModality::for_voice_mode(false), ResponseModality::Text);
    }

    #[tokio::test]
    async fn test_session_creation_with_config() {
        let session = GeminiLive::new(LiveConfig {
            api_key: "test_key".to_string(),
            voice_mode_enabled: true,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.voice_mode_enabled());
        assert_eq!(session.model(), DEFAULT_LIVE_MODEL);
    }
}
