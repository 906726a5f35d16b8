//! Per-hostname retrieval index over stylesheet chunk embeddings.
//!
//! The index persists under the run's index root as two files:
//! `index.json` (chunk text + embedding pairs) and `meta.json`. The
//! metadata records the embedding model id so a model change forces a
//! rebuild instead of silently reusing incompatible vectors.

use crate::chunk::split_text;
use crate::embedding::EmbeddingProvider;
use crate::error::{CloneError, CloneResult};
use crate::storage::RunStorage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const INDEX_FILE: &str = "index.json";
const META_FILE: &str = "meta.json";

/// Index metadata used for the staleness check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    /// Hostname this index was built for.
    pub hostname: String,
    /// Number of chunks embedded.
    pub chunk_count: usize,
    /// Embedding model id used at build time.
    pub embedding_model: String,
    /// Build timestamp, seconds since the epoch.
    pub built_at: u64,
}

/// A stored chunk with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    text: String,
    embedding: Vec<f32>,
}

/// Nearest-neighbor index over a hostname's stylesheet chunks.
#[derive(Debug)]
pub struct VectorIndex {
    meta: IndexMeta,
    records: Vec<IndexRecord>,
    dir: PathBuf,
}

impl VectorIndex {
    /// Load the index for `hostname` if present and compatible, else
    /// build it from the run's stored stylesheet.
    pub async fn get_or_build(
        storage: &RunStorage,
        hostname: &str,
        embedder: &dyn EmbeddingProvider,
        client: &reqwest::Client,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> CloneResult<Self> {
        let dir = storage.index_dir(hostname);

        if let Some(index) = Self::try_load(&dir, hostname, embedder.model_id())? {
            return Ok(index);
        }

        let css = storage.load_stylesheet(hostname)?;
        let chunks = split_text(&css, chunk_size, chunk_overlap);
        log::debug!("building index for {}: {} chunks", hostname, chunks.len());

        let inputs: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        let embeddings = embedder.embed_batch(&inputs, client).await?;
        if embeddings.len() != chunks.len() {
            return Err(CloneError::Embedding(format!(
                "got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexRecord { text, embedding })
            .collect();

        let meta = IndexMeta {
            hostname: hostname.to_string(),
            chunk_count: records.len(),
            embedding_model: embedder.model_id().to_string(),
            built_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };

        let index = Self { meta, records, dir };
        index.persist()?;
        Ok(index)
    }

    /// Load a persisted index when its metadata matches the current
    /// embedding model. A mismatch is logged and treated as absent.
    fn try_load(dir: &Path, hostname: &str, model_id: &str) -> CloneResult<Option<Self>> {
        let meta_path = dir.join(META_FILE);
        let index_path = dir.join(INDEX_FILE);
        if !meta_path.exists() || !index_path.exists() {
            return Ok(None);
        }

        let meta: IndexMeta = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)?;
        if meta.embedding_model != model_id {
            log::warn!(
                "index for {} built with {}, current model is {}; rebuilding",
                hostname,
                meta.embedding_model,
                model_id
            );
            return Ok(None);
        }

        let records: Vec<IndexRecord> =
            serde_json::from_str(&std::fs::read_to_string(&index_path)?)?;
        if records.len() != meta.chunk_count {
            log::warn!("index for {} is truncated; rebuilding", hostname);
            return Ok(None);
        }

        log::debug!("loaded index for {}: {} chunks", hostname, records.len());

        Ok(Some(Self {
            meta,
            records,
            dir: dir.to_path_buf(),
        }))
    }

    fn persist(&self) -> CloneResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(
            self.dir.join(INDEX_FILE),
            serde_json::to_string(&self.records)?,
        )?;
        std::fs::write(self.dir.join(META_FILE), serde_json::to_string(&self.meta)?)?;
        Ok(())
    }

    /// Index metadata.
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Return up to `k` chunk texts by descending cosine similarity to
    /// the query.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn EmbeddingProvider,
        client: &reqwest::Client,
    ) -> CloneResult<Vec<&str>> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = embedder.embed(query, client).await?;

        let mut scored: Vec<(f32, &str)> = self
            .records
            .iter()
            .map(|record| {
                (
                    cosine_similarity(&query_embedding, &record.embedding),
                    record.text.as_str(),
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored.into_iter().take(k).map(|(_, text)| text).collect())
    }
}

/// Cosine similarity between two vectors; zero for degenerate inputs.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloneConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic test embedder: counts of 'a', 'b', 'c' per input.
    struct LetterEmbedder {
        model: String,
        calls: AtomicUsize,
    }

    impl LetterEmbedder {
        fn new(model: &str) -> Self {
            Self {
                model: model.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed_batch(
            &self,
            inputs: &[&str],
            _client: &reqwest::Client,
        ) -> CloneResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs
                .iter()
                .map(|input| {
                    let count = |ch: char| input.chars().filter(|c| *c == ch).count() as f32;
                    vec![count('a'), count('b'), count('c')]
                })
                .collect())
        }

        fn model_id(&self) -> &str {
            &self.model
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn test_storage(root: &Path) -> RunStorage {
        let config = CloneConfig::new()
            .with_css_root(root.join("raw_css"))
            .with_index_root(root.join("css_chunks"));
        RunStorage::new(&config).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_build_and_search() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path());
        let client = reqwest::Client::new();
        let embedder = LetterEmbedder::new("letters-v1");

        storage
            .save_stylesheet(&["aaaa", "bbbb", "cccc"], "https://example.com")
            .unwrap();

        let index = VectorIndex::get_or_build(
            &storage,
            "example.com",
            &embedder,
            &client,
            1000,
            200,
        )
        .await
        .unwrap();
        assert_eq!(index.len(), 1);

        let hits = index.search("aa", 1, &embedder, &client).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("aaaa"));
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path());
        let client = reqwest::Client::new();
        let embedder = LetterEmbedder::new("letters-v1");

        // Small chunk size so each rule lands in its own chunk.
        let css = "aaaaaaaa\n\nbbbbbbbb\n\ncccccccc";
        storage
            .save_stylesheet(&[css], "https://example.com")
            .unwrap();

        let index =
            VectorIndex::get_or_build(&storage, "example.com", &embedder, &client, 10, 0)
                .await
                .unwrap();
        assert!(index.len() >= 3);

        let hits = index
            .search("bbb", index.len(), &embedder, &client)
            .await
            .unwrap();
        assert!(hits[0].contains('b'));
    }

    #[tokio::test]
    async fn test_load_skips_reembedding() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path());
        let client = reqwest::Client::new();
        let embedder = LetterEmbedder::new("letters-v1");

        storage
            .save_stylesheet(&["abc abc abc"], "https://example.com")
            .unwrap();

        let _ = VectorIndex::get_or_build(&storage, "example.com", &embedder, &client, 1000, 200)
            .await
            .unwrap();
        let builds = embedder.calls.load(Ordering::SeqCst);

        let again =
            VectorIndex::get_or_build(&storage, "example.com", &embedder, &client, 1000, 200)
                .await
                .unwrap();
        assert_eq!(again.meta().embedding_model, "letters-v1");
        // Loading from disk makes no further embedding calls.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), builds);
    }

    #[tokio::test]
    async fn test_model_change_rebuilds() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path());
        let client = reqwest::Client::new();

        storage
            .save_stylesheet(&["abc abc abc"], "https://example.com")
            .unwrap();

        let v1 = LetterEmbedder::new("letters-v1");
        let _ = VectorIndex::get_or_build(&storage, "example.com", &v1, &client, 1000, 200)
            .await
            .unwrap();

        let v2 = LetterEmbedder::new("letters-v2");
        let rebuilt = VectorIndex::get_or_build(&storage, "example.com", &v2, &client, 1000, 200)
            .await
            .unwrap();
        assert_eq!(rebuilt.meta().embedding_model, "letters-v2");
        assert_eq!(v2.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_stylesheet_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = test_storage(tmp.path());
        let client = reqwest::Client::new();
        let embedder = LetterEmbedder::new("letters-v1");

        let err = VectorIndex::get_or_build(&storage, "missing.example", &embedder, &client, 1000, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::MissingStylesheet(_)));
    }
}
