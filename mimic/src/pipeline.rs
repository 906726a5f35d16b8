//! The draft-then-retrieve-then-refine pipeline.

use crate::config::CloneConfig;
use crate::embedding::{EmbeddingProvider, OpenAIEmbedder};
use crate::error::{CloneError, CloneResult};
use crate::index::VectorIndex;
use crate::llm::{AnthropicProvider, LlmProvider, OpenAIProvider};
use crate::resolver::resolve_selector;
use crate::scrape::{HostedScraper, ScrapeProvider};
use crate::skeleton::{fetch_screenshot, generate_skeleton};
use crate::splice::{combine_css, extract_selectors, inject_style, refine};
use crate::storage::{hostname_of, output_file_name, RunStorage};
use std::path::PathBuf;

/// Result of one clone run.
#[derive(Debug, Clone)]
pub struct ClonedPage {
    /// Hostname the page was cloned from.
    pub hostname: String,
    /// The final HTML document.
    pub html: String,
    /// Where the document was persisted.
    pub path: PathBuf,
}

/// Webpage visual cloning pipeline.
///
/// Holds the HTTP client, the scraping/LLM/embedding providers, and the
/// run configuration. Each [`clone_page`](Self::clone_page) call owns
/// its storage for the duration of the run and tears it down at the
/// end, so an `Arc<ClonePipeline>` can serve concurrent requests.
///
/// # Example
/// ```ignore
/// use mimic::ClonePipeline;
///
/// let pipeline = ClonePipeline::from_env()?;
/// let page = pipeline.clone_page("https://www.example.com", "coffee shop").await?;
/// println!("written to {:?}", page.path);
/// ```
pub struct ClonePipeline {
    client: reqwest::Client,
    multimodal: Box<dyn LlmProvider>,
    resolver: Box<dyn LlmProvider>,
    embedder: Box<dyn EmbeddingProvider>,
    scraper: Box<dyn ScrapeProvider>,
    config: CloneConfig,
}

impl std::fmt::Debug for ClonePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClonePipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClonePipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> ClonePipelineBuilder {
        ClonePipelineBuilder::new()
    }

    /// Build a pipeline from environment credentials and defaults.
    pub fn from_env() -> CloneResult<Self> {
        Self::builder().with_config(CloneConfig::from_env()?).build()
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &CloneConfig {
        &self.config
    }

    /// Clone the visual appearance of `url` into a standalone HTML
    /// document rewritten for `topic`.
    ///
    /// The run's stylesheet and index storage is removed before this
    /// returns, on both the success and error paths.
    pub async fn clone_page(&self, url: &str, topic: &str) -> CloneResult<ClonedPage> {
        if url.is_empty() {
            return Err(CloneError::InvalidInput("No URL provided"));
        }

        let storage = RunStorage::new(&self.config)?;
        let result = self.run(&storage, url, topic).await;

        if let Err(e) = storage.cleanup() {
            log::warn!("cleanup failed for run {}: {}", storage.run_id(), e);
        }

        result
    }

    async fn run(&self, storage: &RunStorage, url: &str, topic: &str) -> CloneResult<ClonedPage> {
        let scraped = self.scraper.scrape(url, &self.client).await?;
        let hostname = hostname_of(url);

        let mut css_parts = scraped.css_content;
        css_parts.extend(scraped.inline_styles);

        // A page without any CSS still gets a draft; resolution is
        // skipped below when nothing was stored.
        if let Err(e) = storage.save_stylesheet(&css_parts, url) {
            log::warn!("no stylesheet stored for {}: {}", hostname, e);
        }

        let screenshot_b64 = fetch_screenshot(&self.client, &scraped.screenshot_url).await?;

        let draft = generate_skeleton(
            &scraped.dom,
            &screenshot_b64,
            topic,
            self.multimodal.as_ref(),
            &self.client,
            self.config.skeleton_max_tokens,
        )
        .await?;

        let selectors = extract_selectors(&draft);
        log::info!(
            "draft for {} has {} selectors to resolve",
            hostname,
            selectors.len()
        );

        let answers = self.resolve_all(storage, &hostname, &selectors).await;

        let css = combine_css(&answers);
        let rough = inject_style(&draft, &css)?;

        let html = refine(
            &rough,
            topic,
            &screenshot_b64,
            self.multimodal.as_ref(),
            &self.client,
            self.config.refine_max_tokens,
        )
        .await?;

        std::fs::create_dir_all(&self.config.output_root)?;
        let path = self.config.output_root.join(output_file_name(url));
        std::fs::write(&path, &html)?;
        log::info!("clone of {} written to {:?}", url, path);

        Ok(ClonedPage {
            hostname,
            html,
            path,
        })
    }

    /// Resolve every selector against the hostname's retrieval index.
    ///
    /// Per-selector failures are dropped from the answer set rather
    /// than failing the run.
    async fn resolve_all(
        &self,
        storage: &RunStorage,
        hostname: &str,
        selectors: &std::collections::BTreeSet<String>,
    ) -> Vec<String> {
        if selectors.is_empty() {
            return Vec::new();
        }

        let index = match VectorIndex::get_or_build(
            storage,
            hostname,
            self.embedder.as_ref(),
            &self.client,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )
        .await
        {
            Ok(index) => index,
            Err(e) => {
                log::warn!("retrieval index unavailable for {}: {}", hostname, e);
                return Vec::new();
            }
        };

        let mut answers = Vec::with_capacity(selectors.len());
        for selector in selectors {
            match resolve_selector(
                selector,
                &index,
                self.resolver.as_ref(),
                self.embedder.as_ref(),
                &self.client,
                self.config.resolver_temperature,
            )
            .await
            {
                Ok(answer) => answers.push(answer),
                Err(e) => log::debug!("selector {} failed to resolve: {}", selector, e),
            }
        }
        answers
    }
}

/// Builder for [`ClonePipeline`].
#[derive(Default)]
pub struct ClonePipelineBuilder {
    config: Option<CloneConfig>,
    multimodal: Option<Box<dyn LlmProvider>>,
    resolver: Option<Box<dyn LlmProvider>>,
    embedder: Option<Box<dyn EmbeddingProvider>>,
    scraper: Option<Box<dyn ScrapeProvider>>,
}

impl ClonePipelineBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pipeline configuration.
    pub fn with_config(mut self, config: CloneConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the multimodal LLM provider.
    pub fn with_multimodal_provider(mut self, provider: Box<dyn LlmProvider>) -> Self {
        self.multimodal = Some(provider);
        self
    }

    /// Override the resolver LLM provider.
    pub fn with_resolver_provider(mut self, provider: Box<dyn LlmProvider>) -> Self {
        self.resolver = Some(provider);
        self
    }

    /// Override the embedding provider.
    pub fn with_embedding_provider(mut self, provider: Box<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Override the scraping provider.
    pub fn with_scrape_provider(mut self, provider: Box<dyn ScrapeProvider>) -> Self {
        self.scraper = Some(provider);
        self
    }

    /// Build the pipeline, filling unset providers from the config's
    /// credentials.
    pub fn build(self) -> CloneResult<ClonePipeline> {
        let config = self.config.unwrap_or_default();

        let multimodal = self.multimodal.unwrap_or_else(|| {
            Box::new(AnthropicProvider::new(
                config.anthropic_api_key.clone(),
                config.multimodal_model.clone(),
            ))
        });
        let resolver = self.resolver.unwrap_or_else(|| {
            Box::new(OpenAIProvider::new(
                config.openai_api_key.clone(),
                config.resolver_model.clone(),
            ))
        });
        let embedder = self.embedder.unwrap_or_else(|| {
            Box::new(OpenAIEmbedder::new(
                config.openai_api_key.clone(),
                config.embedding_model.clone(),
            ))
        });
        let scraper = self
            .scraper
            .unwrap_or_else(|| Box::new(HostedScraper::new(config.scraper_api_key.clone())));

        if !multimodal.is_configured() {
            return Err(CloneError::InvalidInput("multimodal provider not configured"));
        }
        if !resolver.is_configured() {
            return Err(CloneError::InvalidInput("resolver provider not configured"));
        }
        if !embedder.is_configured() {
            return Err(CloneError::InvalidInput("embedding provider not configured"));
        }
        if !scraper.is_configured() {
            return Err(CloneError::InvalidInput("scrape provider not configured"));
        }

        Ok(ClonePipeline {
            client: reqwest::Client::new(),
            multimodal,
            resolver,
            embedder,
            scraper,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionOptions, CompletionResponse, ContentBlock, Message};
    use crate::scrape::ScrapeResult;
    use async_trait::async_trait;

    const DRAFT: &str = r#"<html><head><title>d</title></head><body>
<!-- CSS_REQ: .button -->
<!-- CSS_REQ: .button -->
<!-- CSS_REQ: #header -->
<p>draft</p>
</body></html>"#;

    /// Routes canned responses by inspecting the prompt text.
    struct ScriptedLlm;

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _options: &CompletionOptions,
            _client: &reqwest::Client,
        ) -> CloneResult<CompletionResponse> {
            let first_text = messages
                .iter()
                .flat_map(|m| m.content.iter())
                .find_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .unwrap_or_default();

            let content = if first_text.contains("For the provided CSS selector") {
                "```css\n.button { color: red; }\n```".to_string()
            } else if first_text.contains("rough draft of an HTML code") {
                let rough = messages
                    .iter()
                    .flat_map(|m| m.content.iter())
                    .find_map(|block| match block {
                        ContentBlock::Text { text }
                            if text.starts_with("Rough Draft of the HTML Code:") =>
                        {
                            Some(text.clone())
                        }
                        _ => None,
                    })
                    .unwrap_or_default();
                format!("<!-- final -->{}", rough.trim_start_matches("Rough Draft of the HTML Code:\n"))
            } else {
                DRAFT.to_string()
            };

            Ok(CompletionResponse {
                content,
                usage: Default::default(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    struct FlatEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FlatEmbedder {
        async fn embed_batch(
            &self,
            inputs: &[&str],
            _client: &reqwest::Client,
        ) -> CloneResult<Vec<Vec<f32>>> {
            Ok(inputs.iter().map(|i| vec![i.len() as f32, 1.0]).collect())
        }

        fn model_id(&self) -> &str {
            "flat-v1"
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    struct CannedScraper;

    #[async_trait]
    impl ScrapeProvider for CannedScraper {
        async fn scrape(
            &self,
            _url: &str,
            _client: &reqwest::Client,
        ) -> CloneResult<ScrapeResult> {
            Ok(ScrapeResult {
                dom: "<html><body><button class=\"button\">go</button></body></html>".into(),
                inline_styles: vec!["#header { font-size: 2rem; }".into()],
                css_content: vec![".button { color: red; padding: 4px; }".into()],
                screenshot_url: "data:image/png;base64,iVBORw0KGgo=".into(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "canned"
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn test_pipeline(root: &std::path::Path) -> ClonePipeline {
        let config = CloneConfig::new()
            .with_css_root(root.join("raw_css"))
            .with_index_root(root.join("css_chunks"))
            .with_output_root(root.join("final_html"));

        ClonePipeline::builder()
            .with_config(config)
            .with_multimodal_provider(Box::new(ScriptedLlm))
            .with_resolver_provider(Box::new(ScriptedLlm))
            .with_embedding_provider(Box::new(FlatEmbedder))
            .with_scrape_provider(Box::new(CannedScraper))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_clone_page_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(tmp.path());

        let page = pipeline
            .clone_page("https://www.example.com", "coffee shop")
            .await
            .unwrap();

        assert_eq!(page.hostname, "example.com");
        assert!(page.html.contains("<style>"));
        assert!(page.html.contains(".button { color: red; }"));
        assert!(!page.html.contains("CSS_REQ"));
        assert!(page.path.exists());
        assert_eq!(std::fs::read_to_string(&page.path).unwrap(), page.html);
    }

    #[tokio::test]
    async fn test_clone_page_cleans_up_run_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(tmp.path());

        pipeline
            .clone_page("https://www.example.com", "coffee shop")
            .await
            .unwrap();

        for root in ["raw_css", "css_chunks"] {
            let dir = tmp.path().join(root);
            let leftovers: Vec<_> = std::fs::read_dir(&dir)
                .map(|entries| entries.flatten().collect())
                .unwrap_or_default();
            assert!(
                leftovers.is_empty(),
                "{} still holds run storage",
                root
            );
        }
    }

    #[tokio::test]
    async fn test_clone_page_rejects_empty_url() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(tmp.path());

        let err = pipeline.clone_page("", "coffee shop").await.unwrap_err();
        assert!(matches!(err, CloneError::InvalidInput(_)));
    }

    #[test]
    fn test_builder_rejects_unconfigured_providers() {
        let err = ClonePipeline::builder()
            .with_config(CloneConfig::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, CloneError::InvalidInput(_)));
    }
}
