//! Configuration for the Gemini search provider.

use serde::{Deserialize, Serialize};

/// Base URL for the Gemini REST API.
pub const GEMINI_SEARCH_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for grounded search requests.
pub const DEFAULT_GEMINI_SEARCH_MODEL: &str = "gemini-2.0-flash";

/// Configuration for [`GeminiSearch`](super::GeminiSearch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSearchConfig {
    /// Gemini API key
    pub api_key: String,
    /// Model identifier, e.g. "gemini-2.0-flash"
    pub model: String,
    /// Base URL override (self-hosted proxies, mock servers in tests)
    pub endpoint: Option<String>,
}

impl GeminiSearchConfig {
    /// Create a configuration with the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_SEARCH_MODEL.to_string(),
            endpoint: None,
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Full `generateContent` request URL for this configuration.
    pub fn request_url(&self) -> String {
        let base = self.endpoint.as_deref().unwrap_or(GEMINI_SEARCH_URL);
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            base, self.model, self.api_key
        )
    }
}
