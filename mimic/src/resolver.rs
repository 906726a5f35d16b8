//! Selector-to-CSS resolution over the retrieval index.

use crate::embedding::EmbeddingProvider;
use crate::error::{CloneError, CloneResult};
use crate::index::VectorIndex;
use crate::llm::{CompletionOptions, LlmProvider, Message};

/// Instruction prompt for extracting one rule block from a chunk.
///
/// Placeholders: `{query}` (the selector), `{docs}` (the retrieved chunk).
pub const RESOLVER_PROMPT: &str = r#"For the provided CSS selector output the singular CLOSEST matching style block

Rules:
1. Only output the CSS block that matches the selector.
2. Do not output any additional text or explanations.
3. The output should be a singular valid CSS block enclosed in braces.
4. If multiple style blocks match the selector, return the one that is most relevant to the query.
5. IMPORTANT: If a style block has a field with "--" in it, INTERPRET it to the CLOSEST normal CSS value that you know.

Example for Rule 5: "--sds-c-button-border-width:2px" should be interpreted as "border-width:2px".

Here is the CSS selector: {query}
Here is the content from the CSS file: {docs}"#;

/// Resolve a selector to its closest stored CSS rule block.
///
/// Retrieves the single nearest chunk for the selector, then asks the
/// model to extract and normalize the one matching rule. The model
/// output is returned raw; downstream fence stripping is the only
/// sanitization.
pub async fn resolve_selector(
    selector: &str,
    index: &VectorIndex,
    llm: &dyn LlmProvider,
    embedder: &dyn EmbeddingProvider,
    client: &reqwest::Client,
    temperature: f32,
) -> CloneResult<String> {
    if selector.trim().is_empty() {
        return Err(CloneError::InvalidInput("No query provided"));
    }

    let hits = index.search(selector, 1, embedder, client).await?;
    let docs = hits.first().copied().unwrap_or_default();

    let prompt = RESOLVER_PROMPT
        .replace("{query}", selector)
        .replace("{docs}", docs);

    let options = CompletionOptions {
        temperature,
        max_tokens: 1024,
    };

    let response = llm
        .complete(vec![Message::user(prompt)], &options, client)
        .await?;

    Ok(response.content)
}
