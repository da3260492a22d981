//! Shared types and traits for web search providers.
//!
//! A search provider resolves a plain-text query into a short grounded
//! answer plus citation and image metadata. Providers are interchangeable
//! behind the [`BaseSearch`] trait; the dispatcher selects one by
//! [`SearchEngine`](crate::search::SearchEngine) at dispatch time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Instruction prepended to every search query so providers answer briefly
/// instead of producing an essay.
pub const CONCISE_ANSWER_INSTRUCTION: &str =
    "Please provide a concise answer to the question. Keep your answer brief and to the point.";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while performing a web search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP request failed before a response was received
    #[error("Search request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Provider returned a non-success status code
    #[error("Search API error ({status}): {message}")]
    ApiError {
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body or status text from the provider
        message: String,
    },

    /// Provider response body could not be parsed
    #[error("Failed to parse search response: {0}")]
    ParseError(String),

    /// Provider is misconfigured (missing API key, unregistered engine)
    #[error("Invalid search configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

// =============================================================================
// Response Types
// =============================================================================

/// A source link backing part of a search answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source URL
    pub url: String,
    /// Human-readable source title
    pub title: String,
}

/// An image surfaced alongside a search answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    /// Image URL
    pub url: String,
    /// Image title or alt text
    pub title: String,
}

/// Structured result of a single search query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Answer text produced by the provider
    pub answer: String,
    /// Sources backing the answer, in provider order
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Images related to the query, in provider order
    #[serde(default)]
    pub images: Vec<ImageResult>,
    /// Rendered HTML block linking back to the underlying web search,
    /// when the provider supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_entry_point: Option<String>,
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback type for formatted search answers ready to display.
pub type SearchMessageCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for the citation list attached to a search answer.
pub type CitationsCallback =
    Arc<dyn Fn(Vec<Citation>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for the image list attached to a search answer.
pub type ImagesCallback =
    Arc<dyn Fn(Vec<ImageResult>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Provider Trait
// =============================================================================

/// Common interface implemented by every search provider.
#[async_trait]
pub trait BaseSearch: Send + Sync {
    /// Run a single query and return the structured response.
    async fn search(&self, query: &str) -> SearchResult<SearchResponse>;

    /// Short provider name used in logs.
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch;

    #[async_trait]
    impl BaseSearch for FixedSearch {
        async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
            Ok(SearchResponse {
                answer: format!("about {query}"),
                ..Default::default()
            })
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let provider: Arc<dyn BaseSearch> = Arc::new(FixedSearch);
        let response = provider.search("rust").await.unwrap();
        assert_eq!(response.answer, "about rust");
        assert!(response.citations.is_empty());
        assert!(response.images.is_empty());
        assert!(response.search_entry_point.is_none());
        assert_eq!(provider.provider_name(), "fixed");
    }

    #[test]
    fn default_response_is_empty() {
        let response = SearchResponse::default();
        assert!(response.answer.is_empty());
        assert!(response.citations.is_empty());
    }

    #[test]
    fn error_display_includes_status() {
        let err = SearchError::ApiError {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "Search API error (429): rate limited");
    }

    #[test]
    fn response_deserializes_with_missing_lists() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"answer":"hi","search_entry_point":null}"#).unwrap();
        assert_eq!(response.answer, "hi");
        assert!(response.citations.is_empty());
        assert!(response.images.is_empty());
        assert!(response.search_entry_point.is_none());
    }
}
