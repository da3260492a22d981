//! Perplexity Sonar web search provider.
//!
//! This module provides a search provider backed by the Perplexity Sonar
//! chat-completions API with web search enabled, with support for:
//!
//! - Short grounded answers with markdown source links appended by the model
//! - Citation extraction from structured message citations, falling back to
//!   bare top-level citation URLs on older response shapes
//! - Related images when the API returns them
//! - A domain allowlist and recency filter tuned for market and news queries
//!
//! # Architecture
//!
//! Each query is one non-streaming `chat/completions` POST: a fixed system
//! prompt asks for a brief answer with source links, and the user message
//! carries the query verbatim. The module is organized into focused
//! submodules:
//!
//! - [`config`]: Configuration (`PerplexitySearchConfig`) and the default
//!   domain allowlist
//! - [`provider`]: The `PerplexitySearch` provider implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use sotto_live::search::{BaseSearch, PerplexitySearch, PerplexitySearchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PerplexitySearchConfig::new("pplx-your-api-key");
//!     let provider = PerplexitySearch::new(config)?;
//!
//!     let response = provider.search("today's S&P 500 close").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```
//!
//! # API Reference
//!
//! - API Endpoint: `POST https://api.perplexity.ai/chat/completions`
//! - Documentation: <https://docs.perplexity.ai/api-reference/chat-completions-post>

mod config;
mod provider;

// Re-export public types
pub use config::{
    DEFAULT_PERPLEXITY_MODEL, DEFAULT_SEARCH_DOMAINS, PERPLEXITY_API_URL, PerplexitySearchConfig,
};
pub use provider::PerplexitySearch;
