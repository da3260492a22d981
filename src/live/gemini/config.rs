//! Gemini Live API configuration.
//!
//! Endpoint and model constants, the response modality negotiated in the
//! setup handshake, and the default per-mode system instructions.

use serde::{Deserialize, Serialize};
use url::Url;

/// Gemini Live API WebSocket endpoint (BidiGenerateContent).
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Default live model.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.0-flash-exp";

/// Sample rate of model audio output.
pub const GEMINI_LIVE_SAMPLE_RATE: u32 = 24000;

/// MIME prefix identifying PCM audio parts in server content.
pub const AUDIO_MIME_PREFIX: &str = "audio/pcm";

/// Delay before reconnecting after a normal closure in voice mode (ms).
pub const NORMAL_CLOSE_RECONNECT_DELAY_MS: u64 = 1000;

/// Settle delay between disconnect and reconnect during reinitialization (ms).
pub const REINITIALIZE_DELAY_MS: u64 = 500;

// =============================================================================
// Response Modality
// =============================================================================

/// Response modality fixed by the setup handshake.
///
/// The live API accepts exactly one modality per connection; switching
/// requires a new handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    /// Synthesized audio responses
    Audio,
    /// Plain text responses
    Text,
}

impl ResponseModality {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "AUDIO",
            Self::Text => "TEXT",
        }
    }

    /// Modality negotiated for the given voice mode.
    pub fn for_voice_mode(voice_mode_enabled: bool) -> Self {
        if voice_mode_enabled {
            Self::Audio
        } else {
            Self::Text
        }
    }
}

impl std::fmt::Display for ResponseModality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// System Instructions
// =============================================================================

/// Default system instruction for voice mode sessions.
pub const DEFAULT_VOICE_INSTRUCTION: &str = "You are a helpful voice assistant. \
Answer every question in English, keep responses conversational, and be brief.";

/// Default system instruction for text mode sessions.
///
/// Text mode runs as a silent meeting assistant: the model stays quiet unless
/// it can add value, and uses the in-band tokens to ask for a screen capture
/// or a web search.
pub const DEFAULT_TEXT_INSTRUCTION: &str = "\
You are a silent meeting assistant. You read the conversation and only answer \
when you can add concrete value.

Rules:
- If no response is needed, reply with exactly NULL.
- If you need to see the user's screen to answer, reply with exactly [SCREEN_REQUEST].
- If the question needs current information from the web, reply with \
[WEB_SEARCH_REQUEST] followed by the search query on the same line.
- Otherwise answer directly, briefly and to the point.";

/// Default system instruction for the given voice mode.
pub fn instruction_for_mode(voice_mode_enabled: bool) -> &'static str {
    if voice_mode_enabled {
        DEFAULT_VOICE_INSTRUCTION
    } else {
        DEFAULT_TEXT_INSTRUCTION
    }
}

/// Build the WebSocket URL for a session, including the API key parameter.
///
/// The base is parsed so that a path-less endpoint override gains the `/`
/// the handshake request line requires.
pub fn build_ws_url(endpoint: Option<&str>, api_key: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(endpoint.unwrap_or(GEMINI_LIVE_URL))?;
    url.set_query(Some(&format!("key={}", api_key)));
    Ok(url.to_string())
}

// =============================================================================
// Tests
// =============================================================================
