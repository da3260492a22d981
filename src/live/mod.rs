//! Live session module.
//!
//! This module manages bidirectional realtime sessions: connection lifecycle
//! and reconnection, the setup handshake, turn accumulation with
//! control-token routing, and the callback surface applications register
//! against.
//!
//! # Session Lifecycle
//!
//! A session moves through [`SessionState`]: `Disconnected` ->
//! `Connecting` -> `SetupPending` -> `Ready`, with `Reconnecting` entered
//! when an established transport drops. Media chunks sent before `Ready`
//! are dropped silently; text sends fail with
//! [`LiveError::NotConnected`].
//!
//! # Control Tokens
//!
//! Completed model turns are scanned for control tokens before any text is
//! surfaced. A turn carrying [`WEB_SEARCH_TOKEN`] becomes a search dispatch,
//! and `NULL`-only turns are suppressed entirely.

mod base;
pub mod gemini;
mod turn;

// Re-export public types and traits
pub use base::{
    LiveConfig, LiveError, LiveResult, MessageCallback, ReconnectionConfig, SessionState,
    SetupCompleteCallback, TranscriptionCallback,
};

// Re-export turn accumulation
pub use turn::{SCREEN_REQUEST_TOKEN, TurnAccumulator, TurnOutcome, WEB_SEARCH_TOKEN};

// Re-export Gemini Live implementation
pub use gemini::{DEFAULT_LIVE_MODEL, GEMINI_LIVE_SAMPLE_RATE, GeminiLive};
