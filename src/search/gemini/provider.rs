//! Gemini grounded search provider.
//!
//! Issues a `generateContent` request with the `google_search` tool enabled
//! and maps the grounding metadata back into a [`SearchResponse`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::config::GeminiSearchConfig;
use crate::search::base::{
    BaseSearch, CONCISE_ANSWER_INSTRUCTION, Citation, SearchError, SearchResponse, SearchResult,
};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
    search_entry_point: Option<SearchEntryPoint>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEntryPoint {
    rendered_content: Option<String>,
}

// =============================================================================
// Provider
// =============================================================================

/// Search provider backed by Gemini `generateContent` with Google Search
/// grounding.
pub struct GeminiSearch {
    config: GeminiSearchConfig,
    client: reqwest::Client,
}

impl GeminiSearch {
    /// Create a provider from a configuration.
    pub fn new(config: GeminiSearchConfig) -> SearchResult<Self> {
        if config.api_key.is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "Gemini search requires an API key".to_string(),
            ));
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    fn build_request_body(query: &str) -> serde_json::Value {
        let prompt = format!("{CONCISE_ANSWER_INSTRUCTION}\n\nQuestion: {query}");
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
            "generationConfig": { "responseModalities": ["TEXT"] },
        })
    }

    fn parse_response(response: GenerateContentResponse) -> SearchResponse {
        let Some(candidate) = response.candidates.into_iter().next() else {
            return SearchResponse::default();
        };

        let answer = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let mut citations = Vec::new();
        let mut search_entry_point = None;
        if let Some(metadata) = candidate.grounding_metadata {
            for chunk in metadata.grounding_chunks {
                if let Some(web) = chunk.web {
                    citations.push(Citation {
                        title: web.title.unwrap_or_else(|| web.uri.clone()),
                        url: web.uri,
                    });
                }
            }
            search_entry_point = metadata
                .search_entry_point
                .and_then(|entry| entry.rendered_content);
        }

        SearchResponse {
            answer,
            citations,
            images: Vec::new(),
            search_entry_point,
        }
    }
}

#[async_trait]
impl BaseSearch for GeminiSearch {
    async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
        debug!(model = %self.config.model, "Sending Gemini search request");

        let response = self
            .client
            .post(self.config.request_url())
            .json(&Self::build_request_body(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| SearchError::ParseError(format!("invalid generateContent body: {e}")))?;

        Ok(Self::parse_response(parsed))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
