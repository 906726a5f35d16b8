//! # Mimic
//!
//! Clone the visual appearance of a webpage into a standalone HTML
//! preview rewritten for a new topic.
//!
//! The pipeline scrapes a URL for its DOM, stylesheets, and a
//! screenshot, asks a multimodal model to draft an HTML skeleton with
//! `<!-- CSS_REQ: <selector> -->` placeholder markers, resolves each
//! marker to the closest real CSS rule via a per-page retrieval index
//! (chunk, embed, nearest-neighbor), splices the retrieved CSS into the
//! draft, and asks the model a second time to reconcile the page
//! against the screenshot.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mimic::ClonePipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads SCRAPER_API_KEY, ANTHROPIC_API_KEY, OPENAI_API_KEY.
//!     let pipeline = ClonePipeline::from_env()?;
//!
//!     let page = pipeline
//!         .clone_page("https://www.example.com", "coffee shop")
//!         .await?;
//!     println!("written to {:?}", page.path);
//!
//!     Ok(())
//! }
//! ```
//!
//! Every run scopes its stylesheet and index storage under a unique run
//! id and removes it before returning, so a shared `Arc<ClonePipeline>`
//! can serve concurrent requests without cross-talk.

#![warn(missing_docs)]

pub mod chunk;
mod config;
pub mod embedding;
mod error;
mod index;
pub mod llm;
mod pipeline;
mod resolver;
pub mod scrape;
mod skeleton;
mod splice;
mod storage;

// Re-exports
pub use config::{
    CloneConfig, DEFAULT_EMBEDDING_MODEL, DEFAULT_MULTIMODAL_MODEL, DEFAULT_RESOLVER_MODEL,
    DOM_SNIPPET_CAP,
};
pub use error::{CloneError, CloneResult};
pub use index::{IndexMeta, VectorIndex};
pub use pipeline::{ClonePipeline, ClonePipelineBuilder, ClonedPage};
pub use resolver::{resolve_selector, RESOLVER_PROMPT};
pub use scrape::{HostedScraper, ScrapeProvider, ScrapeResult};
pub use skeleton::{
    fetch_screenshot, generate_skeleton, truncate_dom, SKELETON_PROMPT, SKELETON_REQUEST,
};
pub use splice::{
    combine_css, extract_selectors, inject_style, refine, strip_code_fences,
    EMPTY_FENCE_SENTINEL, REFINE_PROMPT,
};
pub use storage::{hostname_of, output_file_name, RunStorage};

pub use embedding::{EmbeddingProvider, OpenAIEmbedder};
pub use llm::{
    AnthropicProvider, CompletionOptions, CompletionResponse, ContentBlock, LlmProvider, Message,
    OpenAIProvider, TokenUsage,
};
