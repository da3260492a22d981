//! Turn accumulation and control token detection.
//!
//! The live service streams one logical model turn as a sequence of content
//! fragments followed by a turn-complete marker. [`TurnAccumulator`] buffers
//! the text fragments of the single open turn and, on completion, classifies
//! the turn into a [`TurnOutcome`]: an ordinary message, an in-band web
//! search request, or silence.
//!
//! Audio fragments are not buffered here. They are streamed to the playback
//! queue as they arrive; only text participates in turn reassembly.

use once_cell::sync::Lazy;
use regex::Regex;

/// In-band token requesting a web search. The remainder of the turn text
/// after the token is the query.
pub const WEB_SEARCH_TOKEN: &str = "[WEB_SEARCH_REQUEST]";

/// In-band token requesting a screen capture. The session does not act on
/// it; the token reaches the consumer through the ordinary message callback
/// and the consumer answers with a follow-up request.
pub const SCREEN_REQUEST_TOKEN: &str = "[SCREEN_REQUEST]";

/// Turn texts that mean "no response needed". Matched against the trimmed
/// turn text; either form suppresses the message callback.
const SILENT_SENTINELS: &[&str] = &["NULL", "..."];

/// Everything after the first search token is the query, newlines included.
static WEB_SEARCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[WEB_SEARCH_REQUEST\](.*)").expect("static pattern compiles")
});

/// Classification of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Ordinary assistant text, delivered through the message callback.
    Message(String),
    /// The turn carried a web search token; `query` is the trimmed text
    /// following the first token occurrence.
    Search { query: String },
    /// Nothing to deliver: empty turn, sentinel text, or a search token
    /// with no query.
    Silent,
}

/// Buffers the text of the single open turn.
///
/// Invariant: at most one turn is open at a time. [`complete`] consumes the
/// buffered text and resets the accumulator, so a fragment can never be
/// attributed to two turns.
///
/// [`complete`]: TurnAccumulator::complete
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
}

impl TurnAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment to the open turn.
    pub fn push_text(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    /// Text buffered so far for the open turn.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the open turn has no buffered text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Discard the open turn without classifying it. Used on teardown.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Close the open turn, classify it, and reset the buffer.
    pub fn complete(&mut self) -> TurnOutcome {
        let text = std::mem::take(&mut self.text);

        if let Some(caps) = WEB_SEARCH_RE.captures(&text) {
            let query = caps
                .get(1)
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            if query.is_empty() {
                // A token with no trailing text is a no-op, not a search.
                return TurnOutcome::Silent;
            }
            return TurnOutcome::Search {
                query: query.to_string(),
            };
        }

        let trimmed = text.trim();
        if trimmed.is_empty() || SILENT_SENTINELS.contains(&trimmed) {
            return TurnOutcome::Silent;
        }

        TurnOutcome::Message(text)
    }
}
