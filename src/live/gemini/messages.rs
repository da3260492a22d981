//! Gemini Live API WebSocket message types.
//!
//! This module defines the wire format for the BidiGenerateContent protocol.
//! All messages are JSON-encoded text frames. Unlike type-tagged protocols,
//! each message is identified by its single top-level key.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server, snake_case):
//! - setup - Handshake fixing model, response modality, and system instruction
//! - realtime_input.media_chunks - Base64 media chunks with a MIME type
//! - realtime_input.text - Plain text input
//!
//! Server messages (received from server, camelCase):
//! - setupComplete - Handshake acknowledged
//! - serverContent.modelTurn.parts - Content fragments (text or inline audio)
//! - serverContent.turnComplete - Marks the end of the current turn
//!
//! Inbound frames are decoded infallibly into [`ServerEvent`]: unknown
//! message shapes become [`ServerEvent::Unhandled`] and invalid payloads
//! become [`ServerEvent::Malformed`], so a bad frame never tears down the
//! session.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{AUDIO_MIME_PREFIX, ResponseModality};

// =============================================================================
// Client Messages (sent to server)
// =============================================================================

/// Client messages for the Gemini Live API.
///
/// External tagging produces the single-key wire shape, e.g.
/// `{"setup": {...}}` and `{"realtime_input": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub enum ClientMessage {
    /// Setup handshake, first message on every connection
    #[serde(rename = "setup")]
    Setup(Setup),

    /// Streaming input (media chunks or text)
    #[serde(rename = "realtime_input")]
    RealtimeInput(RealtimeInput),
}

/// Setup handshake payload.
#[derive(Debug, Clone, Serialize)]
pub struct Setup {
    /// Model resource name, e.g. "models/gemini-2.0-flash-exp"
    pub model: String,

    /// Generation configuration
    pub generation_config: GenerationConfig,

    /// System instruction for the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
}

/// Generation configuration inside the setup handshake.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    /// Response modalities; the live API accepts exactly one
    pub response_modalities: Vec<ResponseModality>,
}

/// System instruction content.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    /// Instruction parts
    pub parts: Vec<TextPart>,
}

/// A plain text part.
#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    /// Text content
    pub text: String,
}

/// Streaming input payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RealtimeInput {
    /// Base64 media chunks
    MediaChunks {
        /// Chunks in capture order
        media_chunks: Vec<MediaChunk>,
    },
    /// Plain text input
    Text {
        /// Text content
        text: String,
    },
}

/// One base64-encoded media chunk.
#[derive(Debug, Clone, Serialize)]
pub struct MediaChunk {
    /// MIME type tag, e.g. "audio/pcm" or "image/jpeg"
    pub mime_type: String,

    /// Base64-encoded payload
    pub data: String,
}

impl ClientMessage {
    /// Build the setup handshake for a session.
    pub fn setup(model: &str, modality: ResponseModality, instruction: &str) -> Self {
        ClientMessage::Setup(Setup {
            model: model.to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec![modality],
            },
            system_instruction: Some(SystemInstruction {
                parts: vec![TextPart {
                    text: instruction.to_string(),
                }],
            }),
        })
    }

    /// Build a media chunk message from an already base64-encoded payload.
    pub fn media_chunk(mime_type: &str, base64_data: &str) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput::MediaChunks {
            media_chunks: vec![MediaChunk {
                mime_type: mime_type.to_string(),
                data: base64_data.to_string(),
            }],
        })
    }

    /// Build a media chunk message from raw bytes.
    pub fn media_chunk_from_bytes(mime_type: &str, data: &[u8]) -> Self {
        Self::media_chunk(mime_type, &BASE64_STANDARD.encode(data))
    }

    /// Build a text input message.
    pub fn text(text: &str) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput::Text {
            text: text.to_string(),
        })
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Messages (received from server)
// =============================================================================

/// Raw server message shape. Every field is optional; unknown fields are
/// ignored so protocol additions do not break decoding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Handshake ack. The payload varies (`true` or an empty object);
    /// presence is what matters.
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,

    /// Model content for the current turn
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

/// Server content envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    /// Fragments of the current model turn
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,

    /// Set on the final message of a turn
    #[serde(default)]
    pub turn_complete: Option<bool>,
}

/// One batch of turn fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    /// Fragments in arrival order
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

/// One content fragment: text, inline data, or both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPart {
    /// Text fragment
    #[serde(default)]
    pub text: Option<String>,

    /// Inline binary fragment (base64)
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

/// Inline binary payload with its MIME type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type, e.g. "audio/pcm;rate=24000"
    pub mime_type: String,

    /// Base64-encoded payload
    pub data: String,
}

impl InlineData {
    /// Whether this payload is PCM audio output.
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with(AUDIO_MIME_PREFIX)
    }
}

/// Decoded inbound event, as consumed by the session.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Setup handshake acknowledged
    SetupComplete,

    /// Content fragments, possibly closing the turn
    Content {
        /// Fragments in arrival order
        parts: Vec<ContentPart>,
        /// Whether this message closes the current turn
        turn_complete: bool,
    },

    /// Valid protocol message this client does not handle
    Unhandled,

    /// Frame was not a valid protocol message
    Malformed {
        /// Decode failure description, for logging
        reason: String,
    },
}

/// Decode a raw text frame into a [`ServerEvent`].
///
/// Never fails: malformed frames map to [`ServerEvent::Malformed`] and are
/// dropped by the caller after logging.
pub fn decode(raw: &str) -> ServerEvent {
    let message: ServerMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(err) => {
            return ServerEvent::Malformed {
                reason: err.to_string(),
            };
        }
    };

    if message.setup_complete.is_some() {
        return ServerEvent::SetupComplete;
    }

    if let Some(content) = message.server_content {
        let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
        return ServerEvent::Content {
            parts,
            turn_complete: content.turn_complete.unwrap_or(false),
        };
    }

    ServerEvent::Unhandled
}

// =============================================================================
// Tests
// =============================================================================
