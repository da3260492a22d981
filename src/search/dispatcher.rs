//! Search dispatch between the live session and the active provider.
//!
//! The dispatcher owns the provider registry, debounces repeated queries,
//! serializes provider calls, and formats provider responses into the
//! composite text block delivered through the message callback. Dispatches
//! run in spawned tasks so session teardown never blocks on an in-flight
//! provider call; an epoch counter lets the session discard results that
//! resolve after teardown or reconnection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error};

use super::SearchEngine;
use crate::search::base::{
    BaseSearch, Citation, CitationsCallback, ImageResult, ImagesCallback, SearchError,
    SearchMessageCallback, SearchResponse,
};

// =============================================================================
// Constants
// =============================================================================

/// Interim message emitted when an identical query repeats inside the
/// debounce window.
pub const SEARCH_PLACEHOLDER: &str = "I'm processing your request. Please wait a moment.";

/// Message emitted when the provider call fails.
pub const SEARCH_APOLOGY: &str =
    "Sorry, I encountered an error while searching. Please try again.";

/// Message emitted when the provider returns neither an answer nor citations.
pub const NO_RESULTS_MESSAGE: &str = "I couldn't find any information on that topic.";

/// Identical queries arriving inside this window are treated as duplicates.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

// =============================================================================
// Types
// =============================================================================

/// Dispatcher lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// No provider call outstanding
    #[default]
    Idle,
    /// A provider call is in flight
    AwaitingProvider,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Idle => write!(f, "Idle"),
            DispatchState::AwaitingProvider => write!(f, "AwaitingProvider"),
        }
    }
}

/// Configuration for [`SearchDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Engine consulted for new queries
    pub engine: SearchEngine,
    /// Duplicate-suppression window
    pub debounce_window: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngine::default(),
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Format a provider response into the composite text block shown to the
/// user: the answer, a `[CITATIONS]` section with one markdown link per
/// citation, and a `[SEARCH_ENTRY_POINT]` section when the provider returned
/// one.
pub fn format_response(response: &SearchResponse) -> String {
    let mut text = response.answer.clone();

    if !response.citations.is_empty() {
        text.push_str("\n\n[CITATIONS]\n");
        let links: Vec<String> = response
            .citations
            .iter()
            .map(|citation| format!("[{}]({})", citation.title, citation.url))
            .collect();
        text.push_str(&links.join("\n"));
    }

    if let Some(entry_point) = &response.search_entry_point {
        text.push_str("\n\n[SEARCH_ENTRY_POINT]\n");
        text.push_str(entry_point);
    }

    text
}

// =============================================================================
// Dispatcher
// =============================================================================

struct DispatcherInner {
    debounce_window: Duration,
    providers: Mutex<HashMap<SearchEngine, Arc<dyn BaseSearch>>>,
    engine: Mutex<SearchEngine>,
    last_submission: Mutex<Option<(String, Instant)>>,
    /// Serializes provider calls so at most one is outstanding
    in_flight: tokio::sync::Mutex<()>,
    state: Mutex<DispatchState>,
    epoch: AtomicU64,
    message_callback: Mutex<Option<SearchMessageCallback>>,
    citations_callback: Mutex<Option<CitationsCallback>>,
    images_callback: Mutex<Option<ImagesCallback>>,
}

/// Debouncing, serializing fan-out point for search queries.
///
/// Clones share the same registry, callbacks, and debounce cache.
#[derive(Clone)]
pub struct SearchDispatcher {
    inner: Arc<DispatcherInner>,
}

impl SearchDispatcher {
    /// Create a dispatcher with no providers registered.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                debounce_window: config.debounce_window,
                providers: Mutex::new(HashMap::new()),
                engine: Mutex::new(config.engine),
                last_submission: Mutex::new(None),
                in_flight: tokio::sync::Mutex::new(()),
                state: Mutex::new(DispatchState::Idle),
                epoch: AtomicU64::new(0),
                message_callback: Mutex::new(None),
                citations_callback: Mutex::new(None),
                images_callback: Mutex::new(None),
            }),
        }
    }

    /// Register (or replace) the provider for an engine.
    pub fn register_provider(&self, engine: SearchEngine, provider: Arc<dyn BaseSearch>) {
        self.inner.providers.lock().insert(engine, provider);
    }

    /// Whether a provider is registered for an engine.
    pub fn has_provider(&self, engine: SearchEngine) -> bool {
        self.inner.providers.lock().contains_key(&engine)
    }

    /// Engine consulted for the next query.
    pub fn engine(&self) -> SearchEngine {
        *self.inner.engine.lock()
    }

    /// Swap the active engine. Applies to the next dispatch, never to an
    /// in-flight one.
    pub fn set_engine(&self, engine: SearchEngine) {
        *self.inner.engine.lock() = engine;
    }

    /// Current dispatcher state.
    pub fn state(&self) -> DispatchState {
        *self.inner.state.lock()
    }

    /// Invalidate all in-flight dispatches; their results are discarded
    /// when they resolve.
    pub fn advance_epoch(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Register the callback receiving formatted answers and placeholder
    /// or apology messages.
    pub fn on_message(&self, callback: SearchMessageCallback) {
        *self.inner.message_callback.lock() = Some(callback);
    }

    /// Register the callback receiving the citation list of each answer.
    pub fn on_citations(&self, callback: CitationsCallback) {
        *self.inner.citations_callback.lock() = Some(callback);
    }

    /// Register the callback receiving the image list of each answer.
    pub fn on_images(&self, callback: ImagesCallback) {
        *self.inner.images_callback.lock() = Some(callback);
    }

    /// Submit a query. Returns immediately; the provider call and callback
    /// delivery run on a spawned task. An identical query inside the
    /// debounce window is answered with a placeholder instead of reaching
    /// the provider, and does not extend the window.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, query: impl Into<String>) {
        let query = query.into();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);

        {
            let mut last = self.inner.last_submission.lock();
            if let Some((previous, at)) = last.as_ref() {
                if *previous == query && at.elapsed() < self.inner.debounce_window {
                    debug!(%query, "Duplicate search query inside debounce window");
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move {
                        inner.emit_message(SEARCH_PLACEHOLDER.to_string()).await;
                    });
                    return;
                }
            }
            *last = Some((query.clone(), Instant::now()));
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_query(query, epoch).await;
        });
    }
}

impl Default for SearchDispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl DispatcherInner {
    async fn run_query(self: Arc<Self>, query: String, epoch: u64) {
        let _in_flight = self.in_flight.lock().await;
        *self.state.lock() = DispatchState::AwaitingProvider;

        let engine = *self.engine.lock();
        let provider = self.providers.lock().get(&engine).cloned();
        let result = match provider {
            Some(provider) => provider.search(&query).await,
            None => Err(SearchError::InvalidConfiguration(format!(
                "no provider registered for search engine '{engine}'"
            ))),
        };

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(%query, "Discarding stale search result");
            *self.state.lock() = DispatchState::Idle;
            return;
        }

        match result {
            Ok(response) => {
                let message = if response.answer.trim().is_empty()
                    && response.citations.is_empty()
                {
                    NO_RESULTS_MESSAGE.to_string()
                } else {
                    format_response(&response)
                };
                let SearchResponse {
                    citations, images, ..
                } = response;

                self.emit_message(message).await;
                if !citations.is_empty() {
                    self.emit_citations(citations).await;
                }
                if !images.is_empty() {
                    self.emit_images(images).await;
                }
            }
            Err(e) => {
                error!(error = %e, %query, "Search request failed");
                self.emit_message(SEARCH_APOLOGY.to_string()).await;
            }
        }

        *self.state.lock() = DispatchState::Idle;
    }

    async fn emit_message(&self, message: String) {
        let callback = self.message_callback.lock().clone();
        if let Some(callback) = callback {
            callback(message).await;
        }
    }

    async fn emit_citations(&self, citations: Vec<Citation>) {
        let callback = self.citations_callback.lock().clone();
        if let Some(callback) = callback {
            callback(citations).await;
        }
    }

    async fn emit_images(&self, images: Vec<ImageResult>) {
        let callback = self.images_callback.lock().clone();
        if let Some(callback) = callback {
            callback(images).await;
        }
    }
}
