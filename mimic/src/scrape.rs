//! Scraping backend client: DOM, stylesheets, and screenshot for a URL.

use crate::error::{CloneError, CloneResult};
use async_trait::async_trait;
use lol_html::{element, rewrite_str, text, RewriteStrSettings};
use std::time::Duration;
use url::Url;

/// Default hosted scraping API endpoint.
const DEFAULT_API_URL: &str = "https://api.hyperbrowser.ai/api/scrape";

/// Delay between scrape job status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum status polls before giving up on a job.
const MAX_POLLS: usize = 90;

/// Everything scraped for one URL.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Raw page HTML.
    pub dom: String,
    /// Text of inline `<style>` elements.
    pub inline_styles: Vec<String>,
    /// Contents of linked stylesheets, in document order. A failed
    /// fetch leaves an error note in its slot.
    pub css_content: Vec<String>,
    /// URL of the full-page screenshot.
    pub screenshot_url: String,
}

/// Scraping backend trait.
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// Scrape a URL for its DOM, CSS, and screenshot.
    async fn scrape(&self, url: &str, client: &reqwest::Client) -> CloneResult<ScrapeResult>;

    /// Provider name for logging/debugging.
    fn provider_name(&self) -> &'static str;

    /// Check if the provider is properly configured.
    fn is_configured(&self) -> bool;
}

/// Hosted browser scraping client.
///
/// Submits a scrape job requesting rendered HTML plus a full-page PNG
/// screenshot, then polls until the job settles.
#[derive(Debug, Clone)]
pub struct HostedScraper {
    api_key: String,
    api_url: String,
}

impl HostedScraper {
    /// Create a new scraper client.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Use a custom API endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn start_job(&self, url: &str, client: &reqwest::Client) -> CloneResult<String> {
        let body = serde_json::json!({
            "url": url,
            "scrapeOptions": {
                "formats": ["html", "screenshot"],
                "screenshotOptions": {
                    "fullPage": true,
                    "format": "png",
                },
            },
        });

        let response = client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CloneError::Scrape(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let json: serde_json::Value = response.json().await?;
        json.get("jobId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| CloneError::Scrape("missing jobId in scrape response".to_string()))
    }

    async fn wait_for_job(
        &self,
        job_id: &str,
        client: &reqwest::Client,
    ) -> CloneResult<serde_json::Value> {
        let job_url = format!("{}/{}", self.api_url, job_id);

        for _ in 0..MAX_POLLS {
            let json: serde_json::Value = client
                .get(&job_url)
                .header("x-api-key", &self.api_key)
                .send()
                .await?
                .json()
                .await?;

            match json.get("status").and_then(|v| v.as_str()) {
                Some("completed") => return Ok(json),
                Some("failed") => {
                    let reason = json
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    return Err(CloneError::Scrape(format!("job failed: {}", reason)));
                }
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }

        Err(CloneError::Scrape(format!(
            "job {} did not settle in time",
            job_id
        )))
    }
}

#[async_trait]
impl ScrapeProvider for HostedScraper {
    async fn scrape(&self, url: &str, client: &reqwest::Client) -> CloneResult<ScrapeResult> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CloneError::InvalidInput(
                "URL must start with 'http://' or 'https://'",
            ));
        }

        let job_id = self.start_job(url, client).await?;
        let job = self.wait_for_job(&job_id, client).await?;

        let html = job
            .pointer("/data/html")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if html.is_empty() {
            return Err(CloneError::Scrape(
                "failed to retrieve HTML content from the provided URL".to_string(),
            ));
        }

        let screenshot_url = job
            .pointer("/data/screenshot")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let (inline_styles, hrefs) = collect_css_refs(&html)?;

        let mut css_content = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            let link = resolve_href(url, &href);
            match fetch_stylesheet(client, &link).await {
                Ok(body) => css_content.push(body),
                Err(e) => {
                    log::debug!("stylesheet fetch failed for {}: {}", link, e);
                    css_content.push(format!("Error fetching CSS from {}: {}", link, e));
                }
            }
        }

        Ok(ScrapeResult {
            dom: html,
            inline_styles,
            css_content,
            screenshot_url,
        })
    }

    fn provider_name(&self) -> &'static str {
        "hosted"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Collect inline `<style>` text and `<link rel="stylesheet">` hrefs.
pub fn collect_css_refs(html: &str) -> CloneResult<(Vec<String>, Vec<String>)> {
    let mut styles = Vec::new();
    let mut hrefs = Vec::new();
    let mut buffer = String::new();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                text!("style", |chunk| {
                    buffer.push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        styles.push(std::mem::take(&mut buffer));
                    }
                    Ok(())
                }),
                element!("link", |el| {
                    let is_stylesheet = el
                        .get_attribute("rel")
                        .map(|rel| rel.eq_ignore_ascii_case("stylesheet"))
                        .unwrap_or(false);
                    if is_stylesheet {
                        if let Some(href) = el.get_attribute("href") {
                            hrefs.push(href);
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| CloneError::Html(e.to_string()))?;

    Ok((styles, hrefs))
}

/// Resolve a stylesheet href against the page URL.
fn resolve_href(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => format!("{}{}", base, href),
    }
}

async fn fetch_stylesheet(client: &reqwest::Client, link: &str) -> CloneResult<String> {
    let response = client.get(link).send().await?.error_for_status()?;
    Ok(response.text().await?)
}
