//! Splice & refine: marker extraction, CSS assembly, style injection,
//! and the final consistency pass.

use crate::error::{CloneError, CloneResult};
use crate::llm::{CompletionOptions, ContentBlock, LlmProvider, Message};
use lazy_static::lazy_static;
use lol_html::html_content::ContentType;
use lol_html::{doc_comments, element, rewrite_str, RewriteStrSettings};
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    /// Matches `<!-- CSS_REQ: <selector> -->` placeholder markers.
    static ref CSS_REQ_RE: Regex = Regex::new(r"<!--\s*CSS_REQ:\s*(\S+)\s*-->")
        .expect("valid CSS_REQ pattern");
}

/// A resolver answer consisting only of an empty code fence.
pub const EMPTY_FENCE_SENTINEL: &str = "```css\n```";

/// Instruction prompt for the refinement pass. `{topic}` is substituted.
pub const REFINE_PROMPT: &str = r#"You will be given a rough draft of an HTML code for the cloned website that has the appropriate CSS options
that the original website uses.

Your task is to look through this code and make sure that the HTML code is well-formed, syntactically correct
and thorough such that the website is aesthetically similar to the website in the following screenshot.

You MUST use the styles provided by the rough draft provided, but you can add more styles if you think they are necessary.
Do NOT delete any of the styles that are currently present in the HTML rough draft code that is provided.

Make sure every text that is shown is about the topic of the website, which is {topic} while keeping all styles & structure the same.

Don't add any additional comments or explanations, just output the final HTML code."#;

/// Extract the deduplicated set of selectors from `CSS_REQ` markers.
pub fn extract_selectors(html: &str) -> BTreeSet<String> {
    CSS_REQ_RE
        .captures_iter(html)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Strip surrounding ```` ```css ```` fence markup from a resolver answer.
pub fn strip_code_fences(css: &str) -> String {
    css.replace("```css", "").replace("```", "").trim().to_string()
}

/// Join surviving CSS answers into one stylesheet string.
///
/// Empty-fence sentinels and answers that strip down to nothing are
/// discarded; the rest are joined with blank-line separators.
pub fn combine_css<S: AsRef<str>>(answers: &[S]) -> String {
    answers
        .iter()
        .map(|raw| raw.as_ref())
        .filter(|raw| raw.trim() != EMPTY_FENCE_SENTINEL)
        .map(strip_code_fences)
        .filter(|css| !css.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Inject a `<style>` element into the draft and remove every `CSS_REQ`
/// comment node.
///
/// The style element is appended to the existing `<head>`; when the
/// draft has none, a head is synthesized and prepended.
pub fn inject_style(draft: &str, css: &str) -> CloneResult<String> {
    let style_block = format!("<style>{}</style>", css);
    let mut head_seen = false;

    let html = rewrite_str(
        draft,
        RewriteStrSettings {
            element_content_handlers: vec![element!("head", |el| {
                head_seen = true;
                el.append(&style_block, ContentType::Html);
                Ok(())
            })],
            document_content_handlers: vec![doc_comments!(|comment| {
                if comment.text().contains("CSS_REQ:") {
                    comment.remove();
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| CloneError::Html(e.to_string()))?;

    if head_seen {
        Ok(html)
    } else {
        Ok(format!("<head>{}</head>{}", style_block, html))
    }
}

/// Final consistency/content pass over the rough draft.
///
/// The model keeps the draft's structure and styles verbatim, may add
/// styles for visual fidelity, and rewrites visible text for the topic.
pub async fn refine(
    rough: &str,
    topic: &str,
    screenshot_b64: &str,
    llm: &dyn LlmProvider,
    client: &reqwest::Client,
    max_tokens: u16,
) -> CloneResult<String> {
    let message = Message::user_blocks(vec![
        ContentBlock::text(REFINE_PROMPT.replace("{topic}", topic)),
        ContentBlock::text(format!("Rough Draft of the HTML Code:\n{}", rough)),
        ContentBlock::text("Here is the screenshot:"),
        ContentBlock::image_base64("image/png", screenshot_b64),
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
    fn test_extract_selectors_dedup() {
        let html = r#"
            <div><!-- CSS_REQ: .button --></div>
            <span><!-- CSS_REQ: #header --></span>
            <div><!-- CSS_REQ: .button --></div>
        "#;
        let selectors = extract_selectors(html);
        assert_eq!(selectors.len(), 2);
        assert!(selectors.contains(".button"));
        assert!(selectors.contains("#header"));
    }

    #[test]
    fn test_extract_selectors_none() {
        assert!(extract_selectors("<div>no markers</div>").is_empty());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```css\n.button { color: red; }\n```"),
            ".button { color: red; }"
        );
        assert_eq!(strip_code_fences(".a { }"), ".a { }");
    }

    #[test]
    fn test_combine_css_drops_sentinel_and_empties() {
        let answers = vec![
            "```css\n.a { color: red; }\n```".to_string(),
            EMPTY_FENCE_SENTINEL.to_string(),
            "```css\n```css".to_string(),
            ".b { margin: 0; }".to_string(),
        ];
        let css = combine_css(&answers);
        assert_eq!(css, ".a { color: red; }\n\n.b { margin: 0; }");
    }

    #[test]
    fn test_inject_style_with_head() {
        let draft = r#"<html><head><title>t</title></head><body><!-- CSS_REQ: .a --><p>hi</p></body></html>"#;
        let out = inject_style(draft, ".a { color: red; }").unwrap();
        assert!(out.contains("<style>.a { color: red; }</style>"));
        assert!(out.contains("<title>t</title>"));
        assert!(!out.contains("CSS_REQ"));
        // Style landed inside the head.
        let head_end = out.find("</head>").unwrap();
        let style_pos = out.find("<style>").unwrap();
        assert!(style_pos < head_end);
    }

    #[test]
    fn test_inject_style_without_head() {
        let draft = "<div><!-- CSS_REQ: .a --><p>hi</p></div>";
        let out = inject_style(draft, ".a { color: red; }").unwrap();
        assert!(out.starts_with("<head><style>"));
        assert!(!out.contains("CSS_REQ"));
        assert!(out.contains("<p>hi</p>"));
    }

    #[test]
    fn test_inject_style_keeps_other_comments() {
        let draft = "<html><head></head><body><!-- keep me --><!-- CSS_REQ: .a --></body></html>";
        let out = inject_style(draft, "").unwrap();
        assert!(out.contains("<!-- keep me -->"));
        assert!(!out.contains("CSS_REQ"));
    }

    #[test]
    fn test_refine_prompt_substitution() {
        let filled = REFINE_PROMPT.replace("{topic}", "coffee shop");
        assert!(filled.contains("which is coffee shop"));
        assert!(!filled.contains("{topic}"));
    }
}
