//! Strictly serialized audio playback.
//!
//! [`PlaybackQueue`] owns the playback schedule for one session: frames are
//! appended in arrival order and played back-to-back through an injected
//! [`AudioSink`], never overlapping. A single worker task awaits each
//! frame's completion before starting the next, so the completion signal of
//! frame *n* always precedes the start of frame *n+1*.
//!
//! The queue tracks a "currently playing" flag and reports transitions
//! through a playing-state callback. Consumers use the flag to gate
//! microphone pass-through while the assistant is speaking.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AudioFrame, AudioResult};

/// Callback type for playing-state transitions.
///
/// Invoked with `true` when playback starts from idle and `false` when the
/// queue drains to empty after a frame finishes.
pub type PlayingStateCallback =
    Arc<dyn Fn(bool) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Output device abstraction for decoded frames.
///
/// `play` must resolve only when the frame has finished playing; the queue
/// relies on that completion signal to serialize frames.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one frame to completion.
    async fn play(&self, frame: AudioFrame) -> AudioResult<()>;
}

/// Sink that discards frames in real time.
///
/// Sleeps for each frame's duration instead of producing sound, so playback
/// pacing and the playing-state transitions behave as with a real device.
/// Used when no audio device is attached (text mode, tests).
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, frame: AudioFrame) -> AudioResult<()> {
        tokio::time::sleep(frame.duration()).await;
        Ok(())
    }
}

/// Strict FIFO playback queue with at-most-one active frame.
pub struct PlaybackQueue {
    inner: Arc<QueueInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct QueueInner {
    sink: Mutex<Arc<dyn AudioSink>>,
    pending: Mutex<VecDeque<AudioFrame>>,
    notify: Notify,
    playing: AtomicBool,
    current_cancel: Mutex<CancellationToken>,
    playing_callback: Mutex<Option<PlayingStateCallback>>,
}

impl PlaybackQueue {
    /// Create a queue backed by [`NullSink`].
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NullSink))
    }

    /// Create a queue backed by the given sink.
    pub fn with_sink(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                sink: Mutex::new(sink),
                pending: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                playing: AtomicBool::new(false),
                current_cancel: Mutex::new(CancellationToken::new()),
                playing_callback: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Replace the output sink. Applies from the next frame.
    pub fn set_sink(&self, sink: Arc<dyn AudioSink>) {
        *self.inner.sink.lock() = sink;
    }

    /// Register the playing-state callback.
    pub fn on_playing_state_change(&self, callback: PlayingStateCallback) {
        *self.inner.playing_callback.lock() = Some(callback);
    }

    /// Append a frame to the playback schedule.
    ///
    /// Must be called from within a tokio runtime; the worker task is
    /// started lazily on the first frame.
    pub fn enqueue(&self, frame: AudioFrame) {
        self.ensure_worker();
        self.inner.pending.lock().push_back(frame);
        self.inner.notify.notify_one();
    }

    /// Whether a frame is currently being played.
    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    /// Number of frames waiting behind the current one.
    pub fn len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Whether no frames are waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.pending.lock().is_empty()
    }

    /// Clear all pending frames and halt the current one immediately.
    ///
    /// Used on session teardown, never on ordinary turn boundaries. The
    /// playing-state callback observes the `false` transition once the
    /// halted frame unwinds.
    pub fn stop(&self) {
        self.inner.pending.lock().clear();
        self.inner.current_cancel.lock().cancel();
        debug!("Playback queue stopped, pending frames cleared");
    }

    fn ensure_worker(&self) {
        let mut guard = self.worker.lock();
        let running = guard.as_ref().is_some_and(|handle| !handle.is_finished());
        if running {
            return;
        }
        let inner = self.inner.clone();
        *guard = Some(tokio::spawn(QueueInner::run(inner)));
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackQueue {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
    }
}

impl QueueInner {
    async fn run(inner: Arc<QueueInner>) {
        loop {
            // Arm the cancel token before popping so a concurrent stop()
            // always reaches the frame about to play.
            let cancel = inner.arm_cancel();
            let frame = inner.pending.lock().pop_front();

            let Some(frame) = frame else {
                inner.set_playing(false).await;
                inner.notify.notified().await;
                continue;
            };

            inner.set_playing(true).await;

            let sink = inner.sink.lock().clone();
            tokio::select! {
                result = sink.play(frame) => {
                    if let Err(err) = result {
                        warn!("Audio sink failed to play frame: {}", err);
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("Current frame halted");
                }
            }

            if inner.pending.lock().is_empty() {
                inner.set_playing(false).await;
            }
        }
    }

    fn arm_cancel(&self) -> CancellationToken {
        let mut guard = self.current_cancel.lock();
        if guard.is_cancelled() {
            *guard = CancellationToken::new();
        }
        guard.clone()
    }

    /// Flip the playing flag, invoking the callback only on transitions.
    async fn set_playing(&self, playing: bool) {
        let was = self.playing.swap(playing, Ordering::SeqCst);
        if was == playing {
            return;
        }
        let callback = self.playing_callback.lock().clone();
        if let Some(callback) = callback {
            callback(playing).await;
        }
    }
}
