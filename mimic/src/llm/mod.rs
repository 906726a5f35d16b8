//! LLM provider abstractions for mimic.

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use crate::error::CloneResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// LLM provider trait for abstracting different model APIs.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a completion request and return the response text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: &CompletionOptions,
        client: &reqwest::Client,
    ) -> CloneResult<CompletionResponse>;

    /// Provider name for logging/debugging.
    fn provider_name(&self) -> &'static str;

    /// Check if the provider is properly configured.
    fn is_configured(&self) -> bool;
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create a user message from explicit content blocks.
    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// A block of message content (Anthropic Messages API shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text block.
    Text {
        /// Text content.
        text: String,
    },
    /// Inline image block.
    Image {
        /// Image payload.
        source: ImageSource,
    },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a base64-encoded image block.
    pub fn image_base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource {
                kind: "base64".to_string(),
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Base64 image payload for vision models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    /// Source type, always "base64".
    #[serde(rename = "type")]
    pub kind: String,
    /// Media type, e.g. "image/png".
    pub media_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

/// Options for completion requests.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Temperature (0.0 - 1.0).
    pub temperature: f32,
    /// Max tokens to generate.
    pub max_tokens: u16,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// Response from a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated text.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens.
    pub input_tokens: u32,
    /// Output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Accumulate usage from another.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
