//! Integration tests for the Gemini Live session client.
//!
//! These tests run the real client against a scripted WebSocket mock and
//! verify:
//! 1. Connection lifecycle and the setup handshake wire format
//! 2. Turn reassembly, NULL suppression, and control-token routing
//! 3. Send gating before and after the session is ready
//! 4. Reconnection behavior for abnormal and normal closes
//! 5. Intentional teardown and forced reinitialization
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all live session tests (no credentials needed)
//! cargo test --test live_session_tests
//! ```

mod mock_providers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use parking_lot::Mutex;
use serial_test::serial;

use mock_providers::live_mock::{LiveMockServer, ServerAction};
use mock_providers::{StringRecorder, wait_for};
use sotto_live::live::DEFAULT_LIVE_MODEL;
use sotto_live::search::format_response;
use sotto_live::{
    BaseSearch, Citation, GeminiLive, LiveConfig, LiveError, ReconnectionConfig, SearchEngine,
    SearchResponse, SearchResult, SessionState,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Config pointed at the mock with fast reconnection delays.
fn mock_config(server: &LiveMockServer) -> LiveConfig {
    LiveConfig {
        api_key: "test-key".to_string(),
        endpoint: Some(server.endpoint()),
        reconnection: Some(ReconnectionConfig {
            enabled: true,
            max_attempts: 5,
            initial_delay_ms: 50,
            max_delay_ms: 200,
            backoff_multiplier: 2.0,
            jitter: false,
        }),
        ..Default::default()
    }
}

async fn connect_and_wait(session: &GeminiLive) {
    session.connect().await.expect("connect failed");
    assert!(
        wait_for(|| session.is_ready(), Duration::from_secs(2)).await,
        "session never became ready"
    );
}

/// Search provider that records the query and returns a canned response.
struct StubSearch {
    last_query: Mutex<Option<String>>,
    response: SearchResponse,
}

impl StubSearch {
    fn with_response(response: SearchResponse) -> Arc<Self> {
        Arc::new(Self {
            last_query: Mutex::new(None),
            response,
        })
    }

    fn last_query(&self) -> Option<String> {
        self.last_query.lock().clone()
    }
}

#[async_trait]
impl BaseSearch for StubSearch {
    async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
        *self.last_query.lock() = Some(query.to_string());
        Ok(self.response.clone())
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

// ============================================================================
// Connection & Handshake
// ============================================================================

#[tokio::test]
async fn test_connect_performs_setup_handshake() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    connect_and_wait(&session).await;

    let setups = server.setup_frames();
    assert_eq!(setups.len(), 1);

    let setup = &setups[0]["setup"];
    assert_eq!(setup["model"], DEFAULT_LIVE_MODEL);
    assert_eq!(
        setup["generation_config"]["response_modalities"][0],
        "TEXT"
    );
    assert!(
        setup["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("meeting assistant")
    );
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    connect_and_wait(&session).await;
    session.connect().await.unwrap();
    session.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.connection_count(), 1);
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_connects_share_one_transport() {
    let server = LiveMockServer::start_idle().await;
    let session = Arc::new(GeminiLive::new(mock_config(&server)).unwrap());

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.connect().await }
    });
    let second = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.connect().await }
    });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert!(
        wait_for(|| session.is_ready(), Duration::from_secs(2)).await,
        "session never became ready"
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_voice_mode_negotiates_audio_modality() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(LiveConfig {
        voice_mode_enabled: true,
        ..mock_config(&server)
    })
    .unwrap();

    connect_and_wait(&session).await;

    let setup = &server.setup_frames()[0]["setup"];
    assert_eq!(
        setup["generation_config"]["response_modalities"][0],
        "AUDIO"
    );
    assert!(
        setup["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("voice assistant")
    );
}

#[tokio::test]
async fn test_custom_system_instruction_sent() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(LiveConfig {
        system_instruction: Some("Always answer in rhyme.".to_string()),
        ..mock_config(&server)
    })
    .unwrap();

    connect_and_wait(&session).await;

    let setup = &server.setup_frames()[0]["setup"];
    assert_eq!(
        setup["system_instruction"]["parts"][0]["text"],
        "Always answer in rhyme."
    );
}

#[tokio::test]
async fn test_setup_complete_callback_fires() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();
    session.on_setup_complete(Arc::new(move || {
        let flag = flag.clone();
        Box::pin(async move {
            flag.store(true, Ordering::SeqCst);
        })
    }));

    connect_and_wait(&session).await;

    assert!(
        wait_for(|| fired.load(Ordering::SeqCst), Duration::from_secs(1)).await,
        "setup complete callback never fired"
    );
}

// ============================================================================
// Turn Handling
// ============================================================================

#[tokio::test]
async fn test_fragmented_turn_reaches_message_callback() {
    let server = LiveMockServer::start(vec![vec![
        ServerAction::content(&["Hel"], false),
        ServerAction::content(&["lo ", "wor"], false),
        ServerAction::content(&["ld"], true),
    ]])
    .await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();
    let recorder = StringRecorder::new();
    session.on_message(recorder.callback());

    connect_and_wait(&session).await;

    assert!(
        wait_for(|| recorder.len() == 1, Duration::from_secs(2)).await,
        "message callback never fired"
    );
    assert_eq!(recorder.values(), vec!["Hello world".to_string()]);
}

#[tokio::test]
async fn test_null_turn_is_suppressed() {
    let server = LiveMockServer::start(vec![vec![
        ServerAction::content(&["NULL"], true),
        ServerAction::content(&["Second turn"], true),
    ]])
    .await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();
    let recorder = StringRecorder::new();
    session.on_message(recorder.callback());

    connect_and_wait(&session).await;

    assert!(
        wait_for(|| recorder.len() >= 1, Duration::from_secs(2)).await,
        "second turn never surfaced"
    );
    assert_eq!(recorder.values(), vec!["Second turn".to_string()]);
}

#[tokio::test]
async fn test_search_token_routes_to_provider_not_message() {
    let server = LiveMockServer::start(vec![vec![ServerAction::content(
        &["[WEB_SEARCH_REQUEST] latest rust release"],
        true,
    )]])
    .await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();

    let response = SearchResponse {
        answer: "Rust 1.84 is out".to_string(),
        citations: vec![Citation {
            url: "https://blog.rust-lang.org".to_string(),
            title: "Rust Blog".to_string(),
        }],
        ..Default::default()
    };
    let stub = StubSearch::with_response(response.clone());
    session.register_search_provider(SearchEngine::Gemini, stub.clone() as Arc<dyn BaseSearch>);

    let recorder = StringRecorder::new();
    session.on_message(recorder.callback());

    connect_and_wait(&session).await;

    assert!(
        wait_for(|| recorder.len() == 1, Duration::from_secs(2)).await,
        "search answer never surfaced"
    );

    // The provider sees the bare query, the callback sees the composite
    assert_eq!(stub.last_query(), Some("latest rust release".to_string()));
    assert_eq!(recorder.values(), vec![format_response(&response)]);
    assert_eq!(
        recorder.values()[0],
        "Rust 1.84 is out\n\n[CITATIONS]\n[Rust Blog](https://blog.rust-lang.org)"
    );
}

#[tokio::test]
async fn test_inline_audio_drives_playback() {
    // 0.2s of silence at 24kHz PCM16 mono
    let pcm = BASE64_STANDARD.encode(vec![0u8; 9600]);
    let server =
        LiveMockServer::start(vec![vec![ServerAction::audio(&pcm, true)]]).await;

    let session = GeminiLive::new(LiveConfig {
        voice_mode_enabled: true,
        ..mock_config(&server)
    })
    .unwrap();

    connect_and_wait(&session).await;

    assert!(
        wait_for(|| session.is_playing(), Duration::from_secs(2)).await,
        "playback never started"
    );
    assert!(
        wait_for(|| !session.is_playing(), Duration::from_secs(2)).await,
        "playback never finished"
    );
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_send_text_reaches_server_when_ready() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    connect_and_wait(&session).await;
    session.send_text("hello there").await.unwrap();

    assert!(
        wait_for(|| !server.client_frames().is_empty(), Duration::from_secs(2)).await,
        "text frame never arrived"
    );
    assert_eq!(
        server.client_frames()[0]["realtime_input"]["text"],
        "hello there"
    );
}

#[tokio::test]
async fn test_media_chunk_sent_when_ready() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    connect_and_wait(&session).await;
    session
        .send_media_chunk("image/jpeg", "aW1hZ2U=")
        .await
        .unwrap();

    assert!(
        wait_for(|| !server.client_frames().is_empty(), Duration::from_secs(2)).await,
        "media chunk never arrived"
    );
    let chunk = &server.client_frames()[0]["realtime_input"]["media_chunks"][0];
    assert_eq!(chunk["mime_type"], "image/jpeg");
    assert_eq!(chunk["data"], "aW1hZ2U=");
}

#[tokio::test]
async fn test_follow_up_sends_image_then_prompt() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    connect_and_wait(&session).await;
    session
        .send_follow_up("c2NyZWVu", "What is on this slide?")
        .await
        .unwrap();

    assert!(
        wait_for(|| server.client_frames().len() == 2, Duration::from_secs(2)).await,
        "follow-up frames never arrived"
    );

    let frames = server.client_frames();
    let chunk = &frames[0]["realtime_input"]["media_chunks"][0];
    assert_eq!(chunk["mime_type"], "image/jpeg");
    assert_eq!(chunk["data"], "c2NyZWVu");
    assert_eq!(
        frames[1]["realtime_input"]["text"],
        "What is on this slide?"
    );
}

#[tokio::test]
async fn test_media_chunk_dropped_before_ready() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    // Not connected at all: silent drop for media, hard error for text
    session.send_media_chunk("image/jpeg", "aW1hZ2U=").await.unwrap();
    let err = session.send_text("hello").await.err().unwrap();
    assert!(matches!(err, LiveError::NotConnected));

    connect_and_wait(&session).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.client_frames().is_empty());
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test]
#[serial]
async fn test_abnormal_close_reconnects_with_fresh_handshake() {
    let server = LiveMockServer::start(vec![
        vec![
            ServerAction::Wait(Duration::from_millis(200)),
            ServerAction::Close(1011),
        ],
        vec![],
    ])
    .await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();
    connect_and_wait(&session).await;

    assert!(
        wait_for(|| server.connection_count() == 2, Duration::from_secs(3)).await,
        "session never reconnected"
    );
    assert!(
        wait_for(|| session.is_ready(), Duration::from_secs(2)).await,
        "session never became ready after reconnect"
    );

    // Each transport performed its own handshake
    let setups = server.setup_frames();
    assert_eq!(setups.len(), 2);
    assert_eq!(setups[1]["setup"]["model"], DEFAULT_LIVE_MODEL);
}

#[tokio::test]
#[serial]
async fn test_dropped_transport_reconnects() {
    let server = LiveMockServer::start(vec![
        vec![ServerAction::Abort],
        vec![],
    ])
    .await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();
    session.connect().await.unwrap();

    assert!(
        wait_for(|| server.connection_count() == 2, Duration::from_secs(3)).await,
        "session never reconnected after transport drop"
    );
    assert!(wait_for(|| session.is_ready(), Duration::from_secs(2)).await);
}

#[tokio::test]
#[serial]
async fn test_text_mode_normal_close_stays_disconnected() {
    let server = LiveMockServer::start(vec![vec![
        ServerAction::Wait(Duration::from_millis(200)),
        ServerAction::Close(1000),
    ]])
    .await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();
    connect_and_wait(&session).await;

    assert!(
        wait_for(
            || session.state() == SessionState::Disconnected,
            Duration::from_secs(2)
        )
        .await,
        "session never settled disconnected"
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_voice_mode_normal_close_reconnects() {
    let server = LiveMockServer::start(vec![
        vec![
            ServerAction::Wait(Duration::from_millis(200)),
            ServerAction::Close(1000),
        ],
        vec![],
    ])
    .await;

    let session = GeminiLive::new(LiveConfig {
        voice_mode_enabled: true,
        ..mock_config(&server)
    })
    .unwrap();
    connect_and_wait(&session).await;

    // Voice sessions retry a server-side close after a fixed 1s delay
    assert!(
        wait_for(|| server.connection_count() == 2, Duration::from_secs(4)).await,
        "voice session never reconnected after normal close"
    );
    assert!(wait_for(|| session.is_ready(), Duration::from_secs(2)).await);
}

// ============================================================================
// Teardown & Reinitialize
// ============================================================================

#[tokio::test]
async fn test_disconnect_is_final() {
    let server = LiveMockServer::start_idle().await;
    let session = GeminiLive::new(mock_config(&server)).unwrap();

    connect_and_wait(&session).await;
    session.disconnect().await;

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_ready());

    let err = session.send_text("hello").await.err().unwrap();
    assert!(matches!(err, LiveError::NotConnected));

    // No reconnection after an intentional teardown
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_disconnect_during_reconnect_delay_stays_disconnected() {
    let server = LiveMockServer::start(vec![vec![
        ServerAction::Wait(Duration::from_millis(200)),
        ServerAction::Close(1011),
    ]])
    .await;

    // Long backoff keeps the session parked in Reconnecting
    let session = GeminiLive::new(LiveConfig {
        reconnection: Some(ReconnectionConfig {
            enabled: true,
            max_attempts: 5,
            initial_delay_ms: 5_000,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: false,
        }),
        ..mock_config(&server)
    })
    .unwrap();
    connect_and_wait(&session).await;

    assert!(
        wait_for(
            || session.state() == SessionState::Reconnecting,
            Duration::from_secs(2)
        )
        .await,
        "session never entered reconnecting"
    );

    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Disconnected);

    // The session task is gone: no late state writes, no new transport
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_forced_reinitialize_renegotiates_modality() {
    let server = LiveMockServer::start(vec![vec![], vec![]]).await;

    let session = GeminiLive::new(mock_config(&server)).unwrap();
    connect_and_wait(&session).await;
    assert!(!session.voice_mode_enabled());

    session.reinitialize(true, true).await.unwrap();

    assert!(
        wait_for(|| session.is_ready(), Duration::from_secs(3)).await,
        "session never came back after reinitialize"
    );
    assert!(session.voice_mode_enabled());

    let setups = server.setup_frames();
    assert_eq!(setups.len(), 2);
    assert_eq!(
        setups[0]["setup"]["generation_config"]["response_modalities"][0],
        "TEXT"
    );
    assert_eq!(
        setups[1]["setup"]["generation_config"]["response_modalities"][0],
        "AUDIO"
    );
}
