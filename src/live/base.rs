//! Base types for the live session layer.
//!
//! This module defines the shared vocabulary used by the Gemini Live session
//! client: the session state machine, error taxonomy, reconnection policy,
//! session configuration, and the callback aliases exposed to consumers.
//!
//! # Audio Format
//!
//! Model audio output is PCM 16-bit signed little-endian at 24kHz sample rate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::search::SearchEngine;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during live session operations.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

impl From<serde_json::Error> for LiveError {
    fn from(err: serde_json::Error) -> Self {
        LiveError::SerializationError(err.to_string())
    }
}

/// Result type for live session operations.
pub type LiveResult<T> = Result<T, LiveError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Configuration for automatic reconnection behavior.
///
/// Abnormal socket closures are retried with exponential backoff; a normal
/// closure in voice mode is retried after a short fixed delay regardless of
/// this policy (voice sessions stay up until the caller tears down).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectionConfig {
    /// Enable automatic reconnection on connection loss.
    /// Default: true
    pub enabled: bool,

    /// Maximum number of reconnection attempts before giving up.
    /// Set to 0 for unlimited attempts.
    /// Default: 0 (unlimited)
    pub max_attempts: u32,

    /// Initial delay between reconnection attempts (milliseconds).
    /// Default: 2000ms
    pub initial_delay_ms: u64,

    /// Maximum delay between reconnection attempts (milliseconds).
    /// Default: 30000ms (30 seconds)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff.
    /// Default: 2.0
    pub backoff_multiplier: f32,

    /// Whether to add jitter to the delay to prevent thundering herd.
    /// Default: false
    pub jitter: bool,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 0,
            initial_delay_ms: 2000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl ReconnectionConfig {
    /// Create a config with reconnection disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number using exponential backoff.
    /// Returns the delay in milliseconds.
    pub fn calculate_delay(&self, attempt: u32) -> u64 {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier as f64;

        // Exponential backoff: base_delay * multiplier^(attempt-1)
        let delay = base_delay * multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = delay.min(self.max_delay_ms as f64);

        if self.jitter {
            // Add up to 25% jitter
            let jitter_range = delay * 0.25;
            let jitter = rand_jitter(jitter_range);
            (delay + jitter) as u64
        } else {
            delay as u64
        }
    }

    /// Check if more reconnection attempts are allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt < self.max_attempts)
    }
}

/// Generate a pseudo-random jitter value using a simple LCG.
/// This avoids pulling in the rand crate for a simple use case.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;
    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // Simple LCG: (a * seed + c) mod m
    let random = ((seed.wrapping_mul(1103515245).wrapping_add(12345)) % (1 << 31)) as f64;
    let normalized = random / (1u64 << 31) as f64; // 0.0 to 1.0
    (normalized - 0.5) * 2.0 * range // -range to +range
}

/// Configuration for a live session.
///
/// All protocol-mode inputs are fixed here at construction time. Changing the
/// response modality requires a full renegotiation through
/// [`reinitialize`](crate::live::GeminiLive::reinitialize); the session never
/// reads mode flags from ambient storage mid-flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use (e.g., "models/gemini-2.0-flash-exp").
    /// Empty selects the default live model.
    #[serde(default)]
    pub model: String,

    /// Whether the session negotiates audio responses (voice mode) or text
    /// responses. Fixed for the lifetime of one handshake.
    #[serde(default)]
    pub voice_mode_enabled: bool,

    /// System instruction override. When unset, a per-mode default is used.
    #[serde(default)]
    pub system_instruction: Option<String>,

    /// WebSocket endpoint override, mainly for tests against a local mock.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Search engine used for in-band web search requests.
    #[serde(default)]
    pub search_engine: SearchEngine,

    /// Reconnection configuration for automatic reconnection on connection loss.
    #[serde(default)]
    pub reconnection: Option<ReconnectionConfig>,
}

// =============================================================================
// Session State
// =============================================================================

/// State of a live session connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not connected to the service
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Socket open, setup handshake sent, waiting for the ack
    SetupPending,
    /// Setup acknowledged, session ready for media and text
    Ready,
    /// Reconnecting after connection loss
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::SetupPending => write!(f, "SetupPending"),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

impl SessionState {
    /// States in which `connect()` is a no-op.
    pub fn is_connect_in_progress(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::SetupPending | SessionState::Ready
        )
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback type for assistant messages (plain text, including composite
/// search results).
pub type MessageCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for setup handshake completion.
pub type SetupCompleteCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for transcription text.
///
/// Reserved: the current protocol surface never produces transcription
/// events, but the registration slot is part of the public API.
pub type TranscriptionCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
