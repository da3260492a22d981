//! Gemini grounded web search provider.
//!
//! This module provides a search provider backed by the Gemini
//! `generateContent` REST API with the `google_search` tool enabled, so
//! answers come back grounded in fresh web results, with support for:
//!
//! - Concise answers synthesized from live search results
//! - Citation links extracted from the grounding metadata
//! - A rendered "search entry point" HTML block linking back to the
//!   underlying Google search
//!
//! # Architecture
//!
//! Grounded search is a plain request/response REST call, not a streaming
//! session: each query is a single `generateContent` POST whose response
//! carries the answer parts and the grounding metadata. The module is
//! organized into focused submodules:
//!
//! - [`config`]: Configuration (`GeminiSearchConfig`) and endpoint constants
//! - [`provider`]: The `GeminiSearch` provider implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use sotto_live::search::{BaseSearch, GeminiSearch, GeminiSearchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = GeminiSearch::new(GeminiSearchConfig::new("your-api-key"))?;
//!
//!     let response = provider.search("current weather in Berlin").await?;
//!     println!("{}", response.answer);
//!     for citation in &response.citations {
//!         println!("  [{}]({})", citation.title, citation.url);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # API Reference
//!
//! - API Endpoint: `POST https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent`
//! - Documentation: <https://ai.google.dev/gemini-api/docs/grounding>

mod config;
mod provider;

// Re-export public types
pub use config::{DEFAULT_GEMINI_SEARCH_MODEL, GEMINI_SEARCH_URL, GeminiSearchConfig};
pub use provider::GeminiSearch;
