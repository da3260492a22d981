//! WebSocket mock for the Gemini Live service.
//!
//! Accepts connections on an ephemeral port, performs the setup handshake
//! (records the client's setup frame, replies `setupComplete`), then plays a
//! scripted sequence of server actions. Each accepted connection consumes
//! the next script in order; connections beyond the last script stay open
//! and idle, recording client traffic for assertions.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// One step a scripted connection performs after the setup handshake.
#[derive(Clone, Debug)]
pub enum ServerAction {
    /// Send a raw JSON frame to the client
    Send(Value),
    /// Pause before the next action
    Wait(Duration),
    /// Close the WebSocket with the given close code
    Close(u16),
    /// Drop the TCP stream without a closing handshake
    Abort,
}

impl ServerAction {
    /// A `serverContent` frame carrying text parts.
    pub fn content(texts: &[&str], turn_complete: bool) -> Self {
        let parts: Vec<Value> = texts.iter().map(|t| json!({"text": t})).collect();
        ServerAction::Send(json!({
            "serverContent": {
                "modelTurn": {"parts": parts},
                "turnComplete": turn_complete,
            }
        }))
    }

    /// A `serverContent` frame carrying one inline audio payload.
    pub fn audio(base64_data: &str, turn_complete: bool) -> Self {
        ServerAction::Send(json!({
            "serverContent": {
                "modelTurn": {"parts": [{
                    "inlineData": {"mimeType": "audio/pcm;rate=24000", "data": base64_data}
                }]},
                "turnComplete": turn_complete,
            }
        }))
    }
}

/// Shared state observed by tests.
#[derive(Default)]
pub struct LiveMockState {
    /// Total connections accepted
    pub connections: AtomicU64,
    /// First frame received on each connection, in accept order
    pub setups: Mutex<Vec<Value>>,
    /// Client frames received after setup, across all connections
    pub received: Mutex<Vec<Value>>,
}

/// Scripted Gemini Live mock server.
pub struct LiveMockServer {
    addr: SocketAddr,
    pub state: Arc<LiveMockState>,
    handle: JoinHandle<()>,
}

impl LiveMockServer {
    /// Start the mock with one script per expected connection.
    pub async fn start(scripts: Vec<Vec<ServerAction>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind live mock listener");
        let addr = listener.local_addr().expect("live mock local addr");
        let state = Arc::new(LiveMockState::default());
        let scripts = Arc::new(Mutex::new(VecDeque::from(scripts)));

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let script = scripts.lock().pop_front().unwrap_or_default();
                let state = accept_state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, script, state).await {
                        eprintln!("Live mock connection error: {}", e);
                    }
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Start the mock with no scripted actions; every connection performs
    /// the handshake, then idles recording client traffic.
    pub async fn start_idle() -> Self {
        Self::start(vec![]).await
    }

    /// Endpoint URL for `LiveConfig::endpoint`.
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> u64 {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Setup frames received, one per connection.
    pub fn setup_frames(&self) -> Vec<Value> {
        self.state.setups.lock().clone()
    }

    /// Client frames received after setup.
    pub fn client_frames(&self) -> Vec<Value> {
        self.state.received.lock().clone()
    }
}

impl Drop for LiveMockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: Vec<ServerAction>,
    state: Arc<LiveMockState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    state.connections.fetch_add(1, Ordering::SeqCst);

    // The first client frame must be the setup message
    let setup = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => break serde_json::from_str::<Value>(&text)?,
            Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        }
    };
    state.setups.lock().push(setup);

    write
        .send(Message::Text(json!({"setupComplete": {}}).to_string().into()))
        .await?;

    for action in script {
        match action {
            ServerAction::Send(frame) => {
                write.send(Message::Text(frame.to_string().into())).await?;
            }
            ServerAction::Wait(duration) => tokio::time::sleep(duration).await,
            ServerAction::Close(code) => {
                write
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::from(code),
                        reason: "scripted close".into(),
                    })))
                    .await?;
                // Give the close frame time to flush before the stream drops
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(());
            }
            ServerAction::Abort => return Ok(()),
        }
    }

    // Stay open, recording client traffic until the peer goes away
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(frame) = serde_json::from_str::<Value>(&text) {
                    state.received.lock().push(frame);
                }
            }
            Ok(Message::Ping(data)) => write.send(Message::Pong(data)).await?,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    Ok(())
}
