//! Stylesheet chunking for the retrieval index.
//!
//! Splits text into overlapping chunks, preferring to break after the
//! longest separator available near the target boundary: paragraph
//! breaks, then line breaks, then spaces, then hard character cuts.
//! Chunks are exact substrings of the input, so overlap-aware
//! concatenation reconstructs the original text.

/// Separators tried longest-first when picking a chunk boundary.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split `text` into chunks of at most `chunk_size` characters with up to
/// `overlap` characters shared between neighbors.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if chunk_size == 0 {
        return vec![text.to_string()];
    }

    // Byte offset of every char boundary, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    if total_chars <= chunk_size {
        return vec![text.to_string()];
    }

    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < total_chars {
        let target_end = (start + chunk_size).min(total_chars);

        if target_end == total_chars {
            chunks.push(text[boundaries[start]..].to_string());
            break;
        }

        // Boundaries below this floor would produce degenerate chunks.
        let floor = start + chunk_size / 2;
        let split = find_split(text, &boundaries, floor, target_end).unwrap_or(target_end);

        chunks.push(text[boundaries[start]..boundaries[split]].to_string());

        let next = split.saturating_sub(overlap);
        start = if next > start { next } else { split };
    }

    chunks
}

/// Find the char index just after the longest separator occurring in
/// `(floor, end]`, trying longer separators first.
fn find_split(text: &str, boundaries: &[usize], floor: usize, end: usize) -> Option<usize> {
    let floor_byte = boundaries[floor];
    let end_byte = boundaries[end];
    let window = &text[floor_byte..end_byte];

    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let split_byte = floor_byte + pos + sep.len();
            if split_byte > floor_byte {
                let split = boundaries
                    .binary_search(&split_byte)
                    .unwrap_or_else(|i| i);
                if split > floor && split <= end {
                    return Some(split);
                }
            }
        }
    }

    None
}
