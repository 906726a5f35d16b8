//! Configuration for the clone pipeline.

use crate::error::{CloneError, CloneResult};
use std::path::PathBuf;

/// Default multimodal model for skeleton generation and refinement.
pub const DEFAULT_MULTIMODAL_MODEL: &str = "claude-sonnet-4-20250514";

/// Default model for selector-to-CSS resolution.
pub const DEFAULT_RESOLVER_MODEL: &str = "gpt-4o-mini";

/// Default embedding model for the retrieval index.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Hard cap on the DOM snippet sent to the skeleton model, in characters.
pub const DOM_SNIPPET_CAP: usize = 10_000;

/// Pipeline configuration.
///
/// Storage roots default to the working directory; each pipeline run
/// scopes its stylesheet and index storage under a unique run id so
/// concurrent runs do not interfere.
#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// Scraping backend API key.
    pub scraper_api_key: String,
    /// Anthropic API key (multimodal skeleton + refine calls).
    pub anthropic_api_key: String,
    /// OpenAI API key (resolver + embeddings).
    pub openai_api_key: String,
    /// Multimodal model id.
    pub multimodal_model: String,
    /// Resolver model id.
    pub resolver_model: String,
    /// Embedding model id.
    pub embedding_model: String,
    /// Root directory for raw stylesheet files.
    pub css_root: PathBuf,
    /// Root directory for retrieval indexes.
    pub index_root: PathBuf,
    /// Root directory for final HTML documents.
    pub output_root: PathBuf,
    /// Chunk target size in characters.
    pub chunk_size: usize,
    /// Chunk overlap in characters.
    pub chunk_overlap: usize,
    /// Resolver sampling temperature.
    pub resolver_temperature: f32,
    /// Max tokens for skeleton generation.
    pub skeleton_max_tokens: u16,
    /// Max tokens for the refinement pass.
    pub refine_max_tokens: u16,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            scraper_api_key: String::new(),
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            multimodal_model: DEFAULT_MULTIMODAL_MODEL.to_string(),
            resolver_model: DEFAULT_RESOLVER_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            css_root: PathBuf::from("raw_css"),
            index_root: PathBuf::from("css_chunks"),
            output_root: PathBuf::from("final_html"),
            chunk_size: 1000,
            chunk_overlap: 200,
            resolver_temperature: 0.2,
            skeleton_max_tokens: 4096,
            refine_max_tokens: 6000,
        }
    }
}

impl CloneConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read credentials from the environment.
    ///
    /// Requires `SCRAPER_API_KEY`, `ANTHROPIC_API_KEY`, and
    /// `OPENAI_API_KEY`.
    pub fn from_env() -> CloneResult<Self> {
        let scraper_api_key = std::env::var("SCRAPER_API_KEY")
            .map_err(|_| CloneError::InvalidInput("SCRAPER_API_KEY not set"))?;
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| CloneError::InvalidInput("ANTHROPIC_API_KEY not set"))?;
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CloneError::InvalidInput("OPENAI_API_KEY not set"))?;

        Ok(Self {
            scraper_api_key,
            anthropic_api_key,
            openai_api_key,
            ..Self::default()
        })
    }

    /// Set the multimodal model.
    pub fn with_multimodal_model(mut self, model: impl Into<String>) -> Self {
        self.multimodal_model = model.into();
        self
    }

    /// Set the resolver model.
    pub fn with_resolver_model(mut self, model: impl Into<String>) -> Self {
        self.resolver_model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the stylesheet storage root.
    pub fn with_css_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.css_root = root.into();
        self
    }

    /// Set the retrieval index root.
    pub fn with_index_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.index_root = root.into();
        self
    }

    /// Set the output root for final HTML documents.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Set the chunking parameters.
    pub fn with_chunking(mut self, size: usize, overlap: usize) -> Self {
        self.chunk_size = size;
        self.chunk_overlap = overlap;
        self
    }
}
