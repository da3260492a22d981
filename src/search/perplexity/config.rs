//! Configuration for the Perplexity search provider.

use serde::{Deserialize, Serialize};

/// Base URL for the Perplexity API.
pub const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";

/// Default Perplexity model for web search.
pub const DEFAULT_PERPLEXITY_MODEL: &str = "sonar";

/// Default domain allowlist applied to search results.
pub const DEFAULT_SEARCH_DOMAINS: [&str; 5] = [
    "google.com",
    "finance.yahoo.com",
    "finance.google.com",
    "marketwatch.com",
    "bloomberg.com",
];

/// Configuration for [`PerplexitySearch`](super::PerplexitySearch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerplexitySearchConfig {
    /// Perplexity API key
    pub api_key: String,
    /// Model identifier, e.g. "sonar"
    pub model: String,
    /// Maximum answer length in tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Number of search results considered per query
    pub top_k: u32,
    /// Result freshness window, e.g. "day"
    pub search_recency_filter: String,
    /// Domains search results may come from
    pub search_domain_filter: Vec<String>,
    /// Ask the API to return related images
    pub return_images: bool,
    /// Ask the API to return follow-up questions
    pub return_related_questions: bool,
    /// Base URL override (mock servers in tests)
    pub endpoint: Option<String>,
}

impl PerplexitySearchConfig {
    /// Create a configuration with the default model and search tuning.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_PERPLEXITY_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.2,
            top_p: 0.9,
            top_k: 3,
            search_recency_filter: "day".to_string(),
            search_domain_filter: DEFAULT_SEARCH_DOMAINS
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
            return_images: true,
            return_related_questions: true,
            endpoint: None,
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the domain allowlist.
    pub fn with_search_domains(mut self, domains: Vec<String>) -> Self {
        self.search_domain_filter = domains;
        self
    }

    /// Override the base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Full chat-completions request URL for this configuration.
    pub fn request_url(&self) -> String {
        let base = self.endpoint.as_deref().unwrap_or(PERPLEXITY_API_URL);
        format!("{base}/chat/completions")
    }
}
