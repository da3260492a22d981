//! Web search subsystem.
//!
//! Two interchangeable providers (Gemini grounded search and Perplexity
//! Sonar) behind the [`BaseSearch`] trait, plus the [`SearchDispatcher`]
//! that debounces queries, serializes provider calls, and formats answers
//! for the live session's message callback.

mod base;
mod dispatcher;
pub mod gemini;
pub mod perplexity;

// Re-export public types and traits
pub use base::{
    BaseSearch, CONCISE_ANSWER_INSTRUCTION, Citation, CitationsCallback, ImageResult,
    ImagesCallback, SearchError, SearchMessageCallback, SearchResponse, SearchResult,
};
pub use dispatcher::{
    DEFAULT_DEBOUNCE_WINDOW, DispatchConfig, DispatchState, NO_RESULTS_MESSAGE, SEARCH_APOLOGY,
    SEARCH_PLACEHOLDER, SearchDispatcher, format_response,
};

// Re-export Gemini implementation
pub use gemini::{DEFAULT_GEMINI_SEARCH_MODEL, GEMINI_SEARCH_URL, GeminiSearch, GeminiSearchConfig};

// Re-export Perplexity implementation
pub use perplexity::{
    DEFAULT_PERPLEXITY_MODEL, DEFAULT_SEARCH_DOMAINS, PERPLEXITY_API_URL, PerplexitySearch,
    PerplexitySearchConfig,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Supported web search engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    /// Gemini generateContent with Google Search grounding
    #[default]
    Gemini,
    /// Perplexity Sonar chat-completions API
    Perplexity,
}

impl SearchEngine {
    /// Engine name as a lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Gemini => "gemini",
            SearchEngine::Perplexity => "perplexity",
        }
    }

    /// Parse an engine name, falling back to the default engine for
    /// unrecognized values.
    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "perplexity" => SearchEngine::Perplexity,
            _ => SearchEngine::Gemini,
        }
    }
}

impl std::fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Create a provider for the given engine with default tuning.
pub fn create_search_provider(
    engine: SearchEngine,
    api_key: &str,
) -> SearchResult<Arc<dyn BaseSearch>> {
    match engine {
        SearchEngine::Gemini => Ok(Arc::new(GeminiSearch::new(GeminiSearchConfig::new(
            api_key,
        ))?)),
        SearchEngine::Perplexity => Ok(Arc::new(PerplexitySearch::new(
            PerplexitySearchConfig::new(api_key),
        )?)),
    }
}

/// List of engines supported by this crate.
pub fn get_supported_search_engines() -> Vec<SearchEngine> {
    vec![SearchEngine::Gemini, SearchEngine::Perplexity]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_round_trip() {
        assert_eq!(SearchEngine::Gemini.to_string(), "gemini");
        assert_eq!(SearchEngine::Perplexity.to_string(), "perplexity");
        assert_eq!(
            SearchEngine::from_str_or_default("PERPLEXITY"),
            SearchEngine::Perplexity
        );
        assert_eq!(
            SearchEngine::from_str_or_default("gemini"),
            SearchEngine::Gemini
        );
    }

    #[test]
    fn unknown_engine_falls_back_to_default() {
        assert_eq!(
            SearchEngine::from_str_or_default("bing"),
            SearchEngine::default()
        );
    }

    #[test]
    fn engine_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SearchEngine::Perplexity).unwrap(),
            "\"perplexity\""
        );
        let parsed: SearchEngine = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(parsed, SearchEngine::Gemini);
    }

    #[test]
    fn factory_builds_matching_provider() {
        let gemini = create_search_provider(SearchEngine::Gemini, "key").unwrap();
        assert_eq!(gemini.provider_name(), "gemini");
        let perplexity = create_search_provider(SearchEngine::Perplexity, "key").unwrap();
        assert_eq!(perplexity.provider_name(), "perplexity");
    }

    #[test]
    fn factory_rejects_empty_key() {
        assert!(create_search_provider(SearchEngine::Gemini, "").is_err());
    }

    #[test]
    fn supported_engines_cover_both_providers() {
        let engines = get_supported_search_engines();
        assert!(engines.contains(&SearchEngine::Gemini));
        assert!(engines.contains(&SearchEngine::Perplexity));
    }
}
