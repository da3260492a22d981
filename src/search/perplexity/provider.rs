//! Perplexity Sonar search provider.
//!
//! Issues a non-streaming chat-completions request tuned for short grounded
//! answers and maps citations and images back into a [`SearchResponse`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::config::PerplexitySearchConfig;
use crate::search::base::{
    BaseSearch, Citation, ImageResult, SearchError, SearchResponse, SearchResult,
};

/// System prompt asking for a brief answer with markdown source links.
const PERPLEXITY_SYSTEM_PROMPT: &str = "Please provide a concise answer to the question. \
     Keep your answer brief and to the point. Add relevant source links at the end in a \
     new line, formatted as [Source name](URL).";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
    presence_penalty: f32,
    frequency_penalty: f32,
    response_format: ResponseFormat,
    search_domain_filter: &'a [String],
    return_images: bool,
    return_related_questions: bool,
    search_recency_filter: &'a str,
    top_k: u32,
    web_search_options: WebSearchOptions,
    return_citations: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct WebSearchOptions {
    search_context_size: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    /// Top-level citation URLs, present on newer API versions
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    /// Structured citations attached to the message, when provided
    #[serde(default)]
    citations: Vec<ApiCitation>,
}

#[derive(Debug, Deserialize)]
struct ApiCitation {
    url: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    image_url: String,
    alt_text: Option<String>,
}

// =============================================================================
// Provider
// =============================================================================

/// Search provider backed by the Perplexity Sonar chat-completions API.
pub struct PerplexitySearch {
    config: PerplexitySearchConfig,
    client: reqwest::Client,
}

impl PerplexitySearch {
    /// Create a provider from a configuration.
    pub fn new(config: PerplexitySearchConfig) -> SearchResult<Self> {
        if config.api_key.is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "Perplexity search requires an API key".to_string(),
            ));
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    fn build_request<'a>(&'a self, query: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: PERPLEXITY_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stream: false,
            presence_penalty: 0.0,
            frequency_penalty: 1.0,
            response_format: ResponseFormat {
                format_type: "text",
            },
            search_domain_filter: &self.config.search_domain_filter,
            return_images: self.config.return_images,
            return_related_questions: self.config.return_related_questions,
            search_recency_filter: &self.config.search_recency_filter,
            top_k: self.config.top_k,
            web_search_options: WebSearchOptions {
                search_context_size: "high",
            },
            return_citations: true,
        }
    }

    fn parse_response(response: ChatCompletionResponse) -> SearchResponse {
        let ChatCompletionResponse {
            choices,
            citations: citation_urls,
            images,
        } = response;

        let message = choices.into_iter().next().and_then(|choice| choice.message);
        let (answer, message_citations) = match message {
            Some(message) => (message.content, message.citations),
            None => (String::new(), Vec::new()),
        };

        // Structured message citations win; older responses only carry
        // bare URLs at the top level.
        let citations = if !message_citations.is_empty() {
            message_citations
                .into_iter()
                .map(|citation| Citation {
                    title: citation
                        .title
                        .filter(|title| !title.is_empty())
                        .unwrap_or_else(|| host_or_url(&citation.url)),
                    url: citation.url,
                })
                .collect()
        } else {
            citation_urls
                .into_iter()
                .map(|url| Citation {
                    title: host_or_url(&url),
                    url,
                })
                .collect()
        };

        let images = images
            .into_iter()
            .map(|image| ImageResult {
                url: image.image_url,
                title: image
                    .alt_text
                    .filter(|alt| !alt.is_empty())
                    .unwrap_or_else(|| "Image".to_string()),
            })
            .collect();

        SearchResponse {
            answer,
            citations,
            images,
            search_entry_point: None,
        }
    }
}

/// Citation title for a bare URL, derived from its host when parseable.
fn host_or_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl BaseSearch for PerplexitySearch {
    async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
        debug!(model = %self.config.model, "Sending Perplexity search request");

        let response = self
            .client
            .post(self.config.request_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&self.build_request(query))
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
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| SearchError::ParseError(format!("invalid chat completion body: {e}")))?;

        Ok(Self::parse_response(parsed))
    }

    fn provider_name(&self) -> &'static str {
        "perplexity"
    }
}
