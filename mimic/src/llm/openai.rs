//! OpenAI-compatible chat completions provider implementation.

use super::{CompletionOptions, CompletionResponse, ContentBlock, LlmProvider, Message, TokenUsage};
use crate::error::{CloneError, CloneResult};
use async_trait::async_trait;

/// Default OpenAI API endpoint.
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat provider.
///
/// Used for the low-temperature selector-to-CSS resolution calls. Shared
/// [`Message`] blocks are translated into the chat-completions wire shape,
/// images becoming `image_url` data URLs.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: model.into(),
        }
    }

    /// Use a custom API endpoint (for compatible APIs).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Change the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Translate a shared message into the chat-completions wire shape.
    fn to_wire(message: &Message) -> serde_json::Value {
        // Single text block collapses to a plain string content field.
        if let [ContentBlock::Text { text }] = message.content.as_slice() {
            return serde_json::json!({
                "role": message.role,
                "content": text,
            });
        }

        let parts: Vec<serde_json::Value> = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => serde_json::json!({
                    "type": "text",
                    "text": text,
                }),
                ContentBlock::Image { source } => serde_json::json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", source.media_type, source.data),
                    },
                }),
            })
            .collect();

        serde_json::json!({
            "role": message.role,
            "content": parts,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: &CompletionOptions,
        client: &reqwest::Client,
    ) -> CloneResult<CompletionResponse> {
        let wire_messages: Vec<serde_json::Value> = messages.iter().map(Self::to_wire).collect();

        let body = serde_json::json!({
            "model": &self.model,
            "messages": wire_messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        let response = client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        if content.is_empty() {
            return Err(CloneError::NoContent);
        }

        let usage = if let Some(u) = json.get("usage") {
            TokenUsage {
                input_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                output_tokens: u
                    .get("completion_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
            }
        } else {
            TokenUsage::default()
        };

        Ok(CompletionResponse { content, usage })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_new() {
        let provider = OpenAIProvider::new("sk-test", "gpt-4o-mini");
        assert!(provider.is_configured());
        assert_eq!(provider.model, "gpt-4o-mini");
    }

    #[test]
    fn test_openai_provider_custom_url() {
        let provider = OpenAIProvider::new("sk-test", "gpt-4o-mini")
            .with_api_url("https://custom.api.com/v1/chat/completions");
        assert_eq!(
            provider.api_url,
            "https://custom.api.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_to_wire_plain_text() {
        let wire = OpenAIProvider::to_wire(&Message::user("hello"));
        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"], "hello");
    }

    #[test]
    fn test_to_wire_multimodal() {
        let msg = Message::user_blocks(vec![
            ContentBlock::text("describe this"),
            ContentBlock::image_base64("image/png", "AAAA"),
        ]);
        let wire = OpenAIProvider::to_wire(&msg);
        let parts = wire["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }
}
