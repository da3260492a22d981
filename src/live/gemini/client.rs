//! Gemini Live session client.
//!
//! Owns the WebSocket connection, the setup handshake, turn accumulation,
//! audio playback, and search dispatch. The connection runs on a spawned
//! task that automatically reconnects with exponential backoff on abnormal
//! closure; voice-mode sessions also come back after a server-side normal
//! close, so a voice session only stays down when the caller tears it down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, info, warn};

use super::config::{
    AUDIO_MIME_PREFIX, DEFAULT_LIVE_MODEL, NORMAL_CLOSE_RECONNECT_DELAY_MS, REINITIALIZE_DELAY_MS,
    ResponseModality, build_ws_url, instruction_for_mode,
};
use super::messages::{ClientMessage, ContentPart, ServerEvent, decode};
use crate::audio::{AudioFrame, AudioSink, PlaybackQueue, PlayingStateCallback};
use crate::live::base::{
    LiveConfig, LiveError, LiveResult, MessageCallback, ReconnectionConfig, SessionState,
    SetupCompleteCallback, TranscriptionCallback,
};
use crate::live::turn::{TurnAccumulator, TurnOutcome};
use crate::search::{
    BaseSearch, CitationsCallback, DispatchConfig, ImagesCallback, SearchDispatcher, SearchEngine,
    create_search_provider,
};

/// Capacity of the outbound message channel.
const WS_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Client
// =============================================================================

/// Bidirectional streaming session against the Gemini Live API.
///
/// The connection task reassembles streamed model turns, routes completed
/// turns through the control-token rules, queues inline audio for playback,
/// and hands search queries to the [`SearchDispatcher`].
pub struct GeminiLive {
    config: LiveConfig,
    model: String,
    voice_mode: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Suppresses reconnection when the caller tears the session down
    intentional_disconnect: Arc<AtomicBool>,
    reconnection_config: ReconnectionConfig,
    turn: Arc<Mutex<TurnAccumulator>>,
    playback: Arc<PlaybackQueue>,
    dispatcher: SearchDispatcher,
    message_callback: Arc<Mutex<Option<MessageCallback>>>,
    setup_complete_callback: Arc<Mutex<Option<SetupCompleteCallback>>>,
    /// Reserved slot; the current protocol surface never fires it
    transcription_callback: Arc<Mutex<Option<TranscriptionCallback>>>,
}

impl GeminiLive {
    /// Create a session from a configuration.
    ///
    /// A Gemini search provider backed by the same API key is registered
    /// automatically; other providers can be added with
    /// [`register_search_provider`](Self::register_search_provider).
    pub fn new(config: LiveConfig) -> LiveResult<Self> {
        if config.api_key.is_empty() {
            return Err(LiveError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            DEFAULT_LIVE_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let reconnection_config = config.reconnection.clone().unwrap_or_default();

        let dispatcher = SearchDispatcher::new(DispatchConfig {
            engine: config.search_engine,
            ..Default::default()
        });
        let gemini_search = create_search_provider(SearchEngine::Gemini, &config.api_key)
            .map_err(|e| LiveError::InvalidConfiguration(e.to_string()))?;
        dispatcher.register_provider(SearchEngine::Gemini, gemini_search);

        Ok(Self {
            model,
            voice_mode: Arc::new(AtomicBool::new(config.voice_mode_enabled)),
            config,
            state: Arc::new(Mutex::new(SessionState::Disconnected)),
            ws_sender: Arc::new(Mutex::new(None)),
            connection_handle: Arc::new(Mutex::new(None)),
            intentional_disconnect: Arc::new(AtomicBool::new(false)),
            reconnection_config,
            turn: Arc::new(Mutex::new(TurnAccumulator::new())),
            playback: Arc::new(PlaybackQueue::new()),
            dispatcher,
            message_callback: Arc::new(Mutex::new(None)),
            setup_complete_callback: Arc::new(Mutex::new(None)),
            transcription_callback: Arc::new(Mutex::new(None)),
        })
    }

    // =========================================================================
    // Connection Lifecycle
    // =========================================================================

    /// Open the transport and start the session.
    ///
    /// Idempotent: a no-op while a connection attempt, an established
    /// session, or a reconnection is in progress.
    pub async fn connect(&self) -> LiveResult<()> {
        // Guard and transition under one lock so racing connects cannot
        // both pass the check
        {
            let mut state = self.state.lock();
            let current = *state;
            if current.is_connect_in_progress() || current == SessionState::Reconnecting {
                debug!(state = %current, "connect() ignored, session already active");
                return Ok(());
            }
            *state = SessionState::Connecting;
        }

        self.intentional_disconnect.store(false, Ordering::SeqCst);

        let url = match build_ws_url(self.config.endpoint.as_deref(), &self.config.api_key) {
            Ok(url) => url,
            Err(e) => {
                *self.state.lock() = SessionState::Disconnected;
                return Err(LiveError::InvalidConfiguration(format!(
                    "Invalid endpoint URL: {e}"
                )));
            }
        };
        let (ws_stream, _response) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.lock() = SessionState::Disconnected;
                return Err(LiveError::ConnectionFailed(e.to_string()));
            }
        };

        info!("Connected to Gemini Live API");

        let (ws_sink, ws_stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<Message>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock() = Some(tx);

        // Clone shared state for the connection task
        let state = Arc::clone(&self.state);
        let ws_sender = Arc::clone(&self.ws_sender);
        let intentional_disconnect = Arc::clone(&self.intentional_disconnect);
        let reconnection_config = self.reconnection_config.clone();
        let turn = Arc::clone(&self.turn);
        let playback = Arc::clone(&self.playback);
        let dispatcher = self.dispatcher.clone();
        let message_callback = Arc::clone(&self.message_callback);
        let setup_complete_callback = Arc::clone(&self.setup_complete_callback);

        // Response modality is fixed for the task's lifetime; reinitialize
        // tears the task down and starts a fresh one
        let voice_mode = self.voice_mode.load(Ordering::SeqCst);
        let model = self.model.clone();
        let instruction = self
            .config
            .system_instruction
            .clone()
            .unwrap_or_else(|| instruction_for_mode(voice_mode).to_string());

        let handle = tokio::spawn(async move {
            let mut ws_sink = ws_sink;
            let mut ws_stream = ws_stream;
            let mut reconnect_attempt: u32 = 0;

            'session: loop {
                // Fresh transport: negotiate the response modality before
                // any other traffic
                let setup = ClientMessage::setup(
                    &model,
                    ResponseModality::for_voice_mode(voice_mode),
                    &instruction,
                );
                *state.lock() = SessionState::SetupPending;

                let mut transport_alive = true;
                match setup.to_json() {
                    Ok(json) => {
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send setup frame: {}", e);
                            transport_alive = false;
                        }
                    }
                    Err(e) => {
                        error!("Failed to serialize setup frame: {}", e);
                        transport_alive = false;
                    }
                }

                let mut normal_close = false;

                while transport_alive {
                    tokio::select! {
                        Some(outbound) = rx.recv() => {
                            let closing = matches!(outbound, Message::Close(_));
                            if let Err(e) = ws_sink.send(outbound).await {
                                error!("Failed to send WebSocket message: {}", e);
                                break;
                            }
                            if closing {
                                normal_close = true;
                                break;
                            }
                        }

                        message = ws_stream.next() => {
                            match message {
                                Some(Ok(Message::Text(text))) => {
                                    match decode(&text) {
                                        ServerEvent::SetupComplete => {
                                            reconnect_attempt = 0;
                                            *state.lock() = SessionState::Ready;
                                            info!("Live session setup complete");
                                            let callback =
                                                setup_complete_callback.lock().clone();
                                            if let Some(callback) = callback {
                                                callback().await;
                                            }
                                        }
                                        ServerEvent::Content { parts, turn_complete } => {
                                            Self::handle_content(
                                                parts,
                                                turn_complete,
                                                &turn,
                                                &playback,
                                                &dispatcher,
                                                &message_callback,
                                            )
                                            .await;
                                        }
                                        ServerEvent::Unhandled => {}
                                        ServerEvent::Malformed { reason } => {
                                            warn!("Dropping malformed server frame: {}", reason);
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(frame))) => {
                                    let code = frame.as_ref().map(|f| f.code);
                                    normal_close = code == Some(CloseCode::Normal);
                                    info!(?code, "WebSocket closed by server");
                                    break;
                                }
                                Some(Ok(Message::Ping(data))) => {
                                    if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                        error!("Failed to send pong: {}", e);
                                    }
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    error!("WebSocket error: {}", e);
                                    break;
                                }
                                None => break,
                            }
                        }
                    }
                }

                // Partial turn content cannot continue across a new handshake
                turn.lock().clear();

                if intentional_disconnect.load(Ordering::SeqCst) {
                    info!("Intentional disconnect, not attempting reconnection");
                    *state.lock() = SessionState::Disconnected;
                    break 'session;
                }

                let delay_ms = if normal_close {
                    if !voice_mode {
                        info!("Server closed the session, staying disconnected");
                        *state.lock() = SessionState::Disconnected;
                        break 'session;
                    }
                    if !reconnection_config.enabled {
                        *state.lock() = SessionState::Disconnected;
                        break 'session;
                    }
                    // Voice sessions come straight back after a server-side
                    // close
                    NORMAL_CLOSE_RECONNECT_DELAY_MS
                } else {
                    if !reconnection_config.should_retry(reconnect_attempt) {
                        warn!(
                            "Reconnection disabled or max attempts ({}) reached",
                            reconnection_config.max_attempts
                        );
                        *state.lock() = SessionState::Disconnected;
                        break 'session;
                    }
                    reconnect_attempt += 1;
                    reconnection_config.calculate_delay(reconnect_attempt)
                };

                *state.lock() = SessionState::Reconnecting;
                info!(
                    "Attempting reconnection {} in {}ms",
                    reconnect_attempt, delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                if intentional_disconnect.load(Ordering::SeqCst) {
                    info!("Disconnect requested during reconnection delay");
                    *state.lock() = SessionState::Disconnected;
                    break 'session;
                }

                match connect_async(url.as_str()).await {
                    Ok((new_stream, _)) => {
                        info!("Reconnected to Gemini Live API");
                        let (new_sink, new_stream) = new_stream.split();
                        ws_sink = new_sink;
                        ws_stream = new_stream;

                        // Anything still resolving against the old
                        // connection is stale now
                        dispatcher.advance_epoch();
                    }
                    Err(e) => {
                        error!("Reconnection attempt {} failed: {}", reconnect_attempt, e);
                        // Next iteration notices the dead sink and retries
                        // with backoff
                        continue;
                    }
                }
            }

            *ws_sender.lock() = None;
            info!("Live connection task ended");
        });

        *self.connection_handle.lock() = Some(handle);

        Ok(())
    }

    /// Tear the session down and stop audio playback.
    ///
    /// In-flight search dispatches are invalidated; their results are
    /// discarded when they resolve.
    pub async fn disconnect(&self) {
        self.intentional_disconnect.store(true, Ordering::SeqCst);

        // Best-effort graceful close before the task is aborted
        let sender = self.ws_sender.lock().take();
        if let Some(sender) = sender {
            let _ = sender.try_send(Message::Close(None));
        }

        let handle = self.connection_handle.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            // The task's own state writes must not land after the final
            // Disconnected write below
            let _ = handle.await;
        }

        self.playback.stop();
        self.dispatcher.advance_epoch();
        self.turn.lock().clear();
        *self.state.lock() = SessionState::Disconnected;

        info!("Disconnected from Gemini Live API");
    }

    /// Renegotiate the response modality.
    ///
    /// A no-op when the mode is unchanged and `force` is false. Otherwise
    /// the session disconnects, waits briefly for server-side teardown, and
    /// reconnects with a fresh handshake in the new mode.
    pub async fn reinitialize(&self, voice_mode_enabled: bool, force: bool) -> LiveResult<()> {
        if self.voice_mode_enabled() == voice_mode_enabled && !force {
            debug!("reinitialize skipped, response mode unchanged");
            return Ok(());
        }

        info!(voice_mode_enabled, "Reinitializing live session");
        self.disconnect().await;
        self.voice_mode.store(voice_mode_enabled, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(REINITIALIZE_DELAY_MS)).await;

        self.connect().await
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Send a media chunk (base64 payload with its MIME type).
    ///
    /// Chunks arriving while the session is not `Ready` are dropped with a
    /// debug log; capture pipelines outrun the handshake and their frames
    /// are not worth queueing.
    pub async fn send_media_chunk(&self, mime_type: &str, base64_data: &str) -> LiveResult<()> {
        if !self.is_ready() {
            debug!(state = %self.state(), "Dropping media chunk, session not ready");
            return Ok(());
        }
        self.send_message(ClientMessage::media_chunk(mime_type, base64_data))
            .await
    }

    /// Send raw PCM audio bytes as a media chunk.
    pub async fn send_audio(&self, data: Bytes) -> LiveResult<()> {
        if !self.is_ready() {
            debug!("Dropping audio chunk, session not ready");
            return Ok(());
        }
        self.send_message(ClientMessage::media_chunk_from_bytes(
            AUDIO_MIME_PREFIX,
            &data,
        ))
        .await
    }

    /// Send user text into the session.
    ///
    /// Unlike media chunks, text sends are caller-initiated, so an
    /// unestablished session surfaces [`LiveError::NotConnected`] instead
    /// of dropping silently.
    pub async fn send_text(&self, text: &str) -> LiveResult<()> {
        if !self.is_ready() {
            return Err(LiveError::NotConnected);
        }
        self.send_message(ClientMessage::text(text)).await
    }

    /// Send a screenshot with a follow-up prompt, as requested by the model
    /// through the screen-request control token.
    pub async fn send_follow_up(&self, image_base64: &str, prompt: &str) -> LiveResult<()> {
        if !self.is_ready() {
            return Err(LiveError::NotConnected);
        }
        self.send_message(ClientMessage::media_chunk("image/jpeg", image_base64))
            .await?;
        self.send_message(ClientMessage::text(prompt)).await
    }

    async fn send_message(&self, message: ClientMessage) -> LiveResult<()> {
        let payload = Message::Text(message.to_json()?.into());
        let sender = self.ws_sender.lock().clone();
        match sender {
            Some(sender) => sender
                .send(payload)
                .await
                .map_err(|e| LiveError::WebSocketError(format!("Failed to queue message: {e}"))),
            None => Err(LiveError::NotConnected),
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Register (or replace) the search provider for an engine.
    pub fn register_search_provider(&self, engine: SearchEngine, provider: Arc<dyn BaseSearch>) {
        self.dispatcher.register_provider(engine, provider);
    }

    /// Whether a search provider is registered for an engine.
    pub fn has_search_provider(&self, engine: SearchEngine) -> bool {
        self.dispatcher.has_provider(engine)
    }

    /// Swap the engine used for subsequent search requests.
    pub fn set_search_engine(&self, engine: SearchEngine) {
        self.dispatcher.set_engine(engine);
    }

    /// Engine used for the next search request.
    pub fn search_engine(&self) -> SearchEngine {
        self.dispatcher.engine()
    }

    // =========================================================================
    // Audio
    // =========================================================================

    /// Replace the playback sink. Applies from the next queued frame.
    pub fn set_audio_sink(&self, sink: Arc<dyn AudioSink>) {
        self.playback.set_sink(sink);
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Register the callback for assistant messages, including composite
    /// search answers.
    pub fn on_message(&self, callback: MessageCallback) {
        self.dispatcher.on_message(Arc::clone(&callback));
        *self.message_callback.lock() = Some(callback);
    }

    /// Register the callback fired when the setup handshake completes.
    pub fn on_setup_complete(&self, callback: SetupCompleteCallback) {
        *self.setup_complete_callback.lock() = Some(callback);
    }

    /// Register the transcription callback.
    ///
    /// Reserved: the current protocol surface never produces transcription
    /// events, so this callback is stored but never fired.
    pub fn on_transcription(&self, callback: TranscriptionCallback) {
        *self.transcription_callback.lock() = Some(callback);
    }

    /// Register the callback fired when audio playback starts or stops.
    pub fn on_playing_state_change(&self, callback: PlayingStateCallback) {
        self.playback.on_playing_state_change(callback);
    }

    /// Register the callback for images attached to search answers.
    pub fn on_images(&self, callback: ImagesCallback) {
        self.dispatcher.on_images(callback);
    }

    /// Register the callback for citations attached to search answers.
    pub fn on_citations(&self, callback: CitationsCallback) {
        self.dispatcher.on_citations(callback);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Whether the setup handshake has completed on the current transport.
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Whether audio playback is active.
    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    /// Whether the session negotiates audio responses.
    pub fn voice_mode_enabled(&self) -> bool {
        self.voice_mode.load(Ordering::SeqCst)
    }

    /// Model the session connects with.
    pub fn model(&self) -> &str {
        &self.model
    }

    // =========================================================================
    // Inbound Content
    // =========================================================================

    async fn handle_content(
        parts: Vec<ContentPart>,
        turn_complete: bool,
        turn: &Mutex<TurnAccumulator>,
        playback: &PlaybackQueue,
        dispatcher: &SearchDispatcher,
        message_callback: &Mutex<Option<MessageCallback>>,
    ) {
        for part in parts {
            if let Some(text) = part.text {
                turn.lock().push_text(&text);
            }
            if let Some(inline) = part.inline_data {
                if inline.is_audio() {
                    match AudioFrame::from_base64(&inline.data) {
                        Ok(frame) => playback.enqueue(frame),
                        Err(e) => warn!("Skipping undecodable audio chunk: {}", e),
                    }
                }
            }
        }

        if turn_complete {
            let outcome = turn.lock().complete();
            match outcome {
                TurnOutcome::Message(text) => {
                    let callback = message_callback.lock().clone();
                    if let Some(callback) = callback {
                        callback(text).await;
                    }
                }
                TurnOutcome::Search { query } => {
                    info!(%query, "Search requested by model");
                    dispatcher.dispatch(query);
                }
                TurnOutcome::Silent => {}
            }
        }
    }
}

impl Drop for GeminiLive {
    fn drop(&mut self) {
        if let Some(handle) = self.connection_handle.lock().take() {
            handle.abort();
        }
    }
}
