//! Skeleton generation: DOM snippet + screenshot to draft HTML with
//! `CSS_REQ` placeholder markers.

use crate::config::DOM_SNIPPET_CAP;
use crate::error::CloneResult;
use crate::llm::{CompletionOptions, ContentBlock, LlmProvider, Message};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Instruction prompt for the skeleton draft. `{topic}` is substituted.
pub const SKELETON_PROMPT: &str = r##"Given a SNIPPET of the HTML DOM of a website and a screenshot of the website, produce
short HTML code that serves as a PREVIEW of a website about {topic}. The preview should be aesthetically
similar to the provided screenshot.

For any CSS styling (colors, fonts, layout), leave a placeholder comment of the form:

<!-- CSS_REQ: <selector> -->

where <selector> is either a class or id that needs styling (for instance, ".button", "#header", "body", etc.).
Do NOT attempt to write actual CSS here - just output the HTML and insert EXACTLY ONE placeholder comment per selector
that needs styling."##;

/// Closing request appended after the screenshot. `{topic}` is substituted.
pub const SKELETON_REQUEST: &str = "Output the aesthetically similar HTML skeleton code for {topic} with placeholders for CSS styling that look like <!-- CSS_REQ: .some-selector -->.";

/// Truncate a DOM snippet to at most `cap` characters, on a char boundary.
pub fn truncate_dom(dom: &str, cap: usize) -> &str {
    match dom.char_indices().nth(cap) {
        Some((idx, _)) => &dom[..idx],
        None => dom,
    }
}

/// Fetch screenshot bytes and encode them for transmission.
///
/// Scraping backends return either a hosted URL or an inline
/// base64 data URL; both are accepted.
pub async fn fetch_screenshot(client: &reqwest::Client, url: &str) -> CloneResult<String> {
    if let Some(rest) = url.strip_prefix("data:") {
        if let Some((_, payload)) = rest.split_once(";base64,") {
            return Ok(payload.to_string());
        }
    }
    let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;
    Ok(STANDARD.encode(&bytes))
}

/// Generate the draft HTML skeleton with placeholder markers.
///
/// The DOM snippet is capped at [`DOM_SNIPPET_CAP`] characters before
/// prompting. A textless model response surfaces as
/// [`CloneError::NoContent`](crate::error::CloneError::NoContent).
pub async fn generate_skeleton(
    dom: &str,
    screenshot_b64: &str,
    topic: &str,
    llm: &dyn LlmProvider,
    client: &reqwest::Client,
    max_tokens: u16,
) -> CloneResult<String> {
    let snippet = truncate_dom(dom, DOM_SNIPPET_CAP);

    let message = Message::user_blocks(vec![
        ContentBlock::text(SKELETON_PROMPT.replace("{topic}", topic)),
        ContentBlock::text(format!("SNIPPET of the HTML DOM:\n{}", snippet)),
        ContentBlock::text("and the screenshot provided below"),
        ContentBlock::image_base64("image/png", screenshot_b64),
        ContentBlock::text(SKELETON_REQUEST.replace("{topic}", topic)),
    ]);

    let options = CompletionOptions {
        temperature: 1.0,
        max_tokens,
    };

    let response = llm.complete(vec![message], &options, client).await?;
    Ok(response.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_dom_under_cap() {
        assert_eq!(truncate_dom("<div></div>", 10_000), "<div></div>");
    }

    #[test]
    fn test_truncate_dom_over_cap() {
        let dom = "x".repeat(12_000);
        assert_eq!(truncate_dom(&dom, 10_000).len(), 10_000);
    }

    #[test]
    fn test_truncate_dom_char_boundary() {
        let dom = "é".repeat(6);
        let cut = truncate_dom(&dom, 3);
        assert_eq!(cut.chars().count(), 3);
        assert_eq!(cut, "ééé");
    }

    #[tokio::test]
    async fn test_fetch_screenshot_data_url() {
        let client = reqwest::Client::new();
        let encoded = fetch_screenshot(&client, "data:image/png;base64,iVBORw0KGgo=")
            .await
            .unwrap();
        assert_eq!(encoded, "iVBORw0KGgo=");
    }

    #[test]
    fn test_skeleton_prompt_mentions_marker_form() {
        assert!(SKELETON_PROMPT.contains("<!-- CSS_REQ: <selector> -->"));
        let filled = SKELETON_PROMPT.replace("{topic}", "coffee shop");
        assert!(filled.contains("a website about coffee shop"));
    }
}
