//! Anthropic Messages API provider implementation.

use super::{CompletionOptions, CompletionResponse, LlmProvider, Message, TokenUsage};
use crate::error::{CloneError, CloneResult};
use async_trait::async_trait;

/// Default Anthropic API endpoint.
const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header required by the Messages API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
///
/// Handles multimodal requests (text + base64 images).
///
/// # Example
/// ```ignore
/// use mimic::llm::{AnthropicProvider, LlmProvider, Message, CompletionOptions};
///
/// let provider = AnthropicProvider::new("sk-ant-...", "claude-sonnet-4-20250514");
/// let client = reqwest::Client::new();
///
/// let response = provider
///     .complete(vec![Message::user("Hello")], &CompletionOptions::default(), &client)
///     .await?;
/// println!("{}", response.content);
/// ```
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    api_url: String,
    model: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: model.into(),
        }
    }

    /// Use a custom API endpoint (for compatible gateways).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Change the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: &CompletionOptions,
        client: &reqwest::Client,
    ) -> CloneResult<CompletionResponse> {
        let body = serde_json::json!({
            "model": &self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": messages,
        });

        let response = client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CloneError::Llm("Authentication failed".to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CloneError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CloneError::Llm(format!("HTTP {}: {}", status, error_text)));
        }

        let json: serde_json::Value = response.json().await?;

        // The response content is a list of blocks; only text blocks carry
        // the generated document. An empty collection is a hard failure.
        let content = json
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if content.is_empty() {
            return Err(CloneError::NoContent);
        }

        let usage = if let Some(u) = json.get("usage") {
            TokenUsage {
                input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                output_tokens: u
                    .get("output_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
            }
        } else {
            TokenUsage::default()
        };

        Ok(CompletionResponse { content, usage })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
