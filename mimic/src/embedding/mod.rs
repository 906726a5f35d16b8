//! Embedding provider abstractions for the retrieval index.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::CloneResult;
use async_trait::async_trait;

/// Embedding provider trait mapping text to fixed-size vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of strings, returning one vector per input in order.
    async fn embed_batch(
        &self,
        inputs: &[&str],
        client: &reqwest::Client,
    ) -> CloneResult<Vec<Vec<f32>>>;

    /// Embed a single string.
    async fn embed(&self, input: &str, client: &reqwest::Client) -> CloneResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[input], client).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::error::CloneError::Embedding("empty embedding batch".into()))
    }

    /// Model identifier, recorded in index metadata to detect staleness.
    fn model_id(&self) -> &str;

    /// Check if the provider is properly configured.
    fn is_configured(&self) -> bool;
}
