//! OpenAI embeddings provider implementation.

use super::EmbeddingProvider;
use crate::error::{CloneError, CloneResult};
use async_trait::async_trait;
use serde::Deserialize;

/// Default OpenAI embeddings endpoint.
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/embeddings";

/// Maximum inputs per embeddings request.
const MAX_BATCH: usize = 128;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI embeddings provider.
///
/// Works with OpenAI and compatible `/v1/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedder {
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAIEmbedder {
    /// Create a new embeddings provider.
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

    async fn embed_chunk_batch(
        &self,
        inputs: &[&str],
        client: &reqwest::Client,
    ) -> CloneResult<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": &self.model,
            "input": inputs,
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
            return Err(CloneError::Embedding("Authentication failed".to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CloneError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CloneError::Embedding(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await?;

        // The API may return entries out of order; the index field is the
        // authoritative position.
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(CloneError::Embedding(format!(
                "got {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    async fn embed_batch(
        &self,
        inputs: &[&str],
        client: &reqwest::Client,
    ) -> CloneResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(MAX_BATCH) {
            vectors.extend(self.embed_chunk_batch(batch, client).await?);
        }
        Ok(vectors)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
