//! # Document index
//!
//! Chunked document content plus embedding vectors, persisted as JSON in the
//! cache directory and searched with a cosine scan. Retrieval embeds the
//! question over the same endpoint the chunks were embedded with and returns
//! the top-K chunks by similarity.
//!
//! A linear scan over every stored vector is deliberate. The corpus this
//! system indexes is a handful of business PDFs, small enough that an ANN
//! structure would be overhead without benefit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::client::EmbeddingClient;
use crate::error::AssistantError;
use crate::orchestrator::{ChunkMetadata, RetrievedChunk, Retriever};

const INDEX_FILE: &str = "document_index.json";

/// Whether an index exists and how much it holds. The UI gates the whole
/// question flow on `initialized`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStatus {
    pub initialized: bool,
    pub document_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    content: String,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_pages: Option<u32>,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexContents {
    documents: Vec<String>,
    chunks: Vec<IndexedChunk>,
}

/// Cosine similarity; 0.0 for mismatched lengths or zero-norm vectors.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// The persisted chunk index.
pub struct DocumentIndex {
    path: PathBuf,
    contents: IndexContents,
}

impl DocumentIndex {
    /// Open the index under `cache_dir`, loading any persisted contents. A
    /// corrupt file is treated as empty.
    pub fn open(cache_dir: &Path) -> Result<Self, AssistantError> {
        fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(INDEX_FILE);

        let contents = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("document index unreadable, starting empty: {e}");
                    IndexContents::default()
                }
            }
        } else {
            IndexContents::default()
        };

        Ok(Self { path, contents })
    }

    /// Add one pre-embedded chunk. The caller persists when done.
    pub fn add_chunk(
        &mut self,
        content: &str,
        source: &str,
        total_pages: Option<u32>,
        embedding: Vec<f32>,
    ) {
        if !self.contents.documents.iter().any(|d| d == source) {
            self.contents.documents.push(source.to_string());
        }
        self.contents.chunks.push(IndexedChunk {
            content: content.to_string(),
            source: source.to_string(),
            total_pages,
            embedding,
        });
    }

    /// Embed and add every chunk of one document, then persist.
    pub async fn add_document(
        &mut self,
        embedder: &EmbeddingClient,
        source: &str,
        chunk_texts: &[String],
        total_pages: Option<u32>,
    ) -> Result<(), AssistantError> {
        for text in chunk_texts {
            let embedding = embedder.embed(text).await?;
            self.add_chunk(text, source, total_pages, embedding);
        }
        self.persist()?;
        info!(source, chunks = chunk_texts.len(), "document indexed");
        Ok(())
    }

    pub fn status(&self) -> IndexStatus {
        IndexStatus {
            initialized: !self.contents.chunks.is_empty(),
            document_count: self.contents.documents.len(),
        }
    }

    /// The `top_k` chunks most similar to `query`, best first.
    fn search(&self, query: &[f32], top_k: usize) -> Vec<&IndexedChunk> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .contents
            .chunks
            .iter()
            .map(|chunk| (cosine(query, &chunk.embedding), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(top_k).map(|(_, c)| c).collect()
    }

    pub fn persist(&self) -> Result<(), AssistantError> {
        let json = serde_json::to_string(&self.contents)
            .map_err(|e| AssistantError::Config(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// [`Retriever`] over a [`DocumentIndex`] and its embedding endpoint.
pub struct DocumentRetriever {
    index: DocumentIndex,
    embedder: EmbeddingClient,
    top_k: usize,
}

impl DocumentRetriever {
    pub fn new(index: DocumentIndex, embedder: EmbeddingClient, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }
}

#[async_trait]
impl Retriever for DocumentRetriever {
    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, AssistantError> {
        if !self.index.status().initialized {
            return Err(AssistantError::IndexNotReady);
        }

        let query = self.embedder.embed(question).await?;
        Ok(self
            .index
            .search(&query, self.top_k)
            .into_iter()
            .map(|chunk| RetrievedChunk {
                content: chunk.content.clone(),
                metadata: ChunkMetadata {
                    source: Some(chunk.source.clone()),
                    total_pages: chunk.total_pages,
                },
            })
            .collect())
    }

    fn index_status(&self) -> IndexStatus {
        self.index.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use httpmock::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_cosine() {
        assert_eq!(cosine(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_ranks_by_similarity() {
        let dir = tempdir().unwrap();
        let mut index = DocumentIndex::open(dir.path()).unwrap();
        index.add_chunk("about returns", "policies.pdf", Some(3), vec![1.0, 0.0]);
        index.add_chunk("about shipping", "policies.pdf", Some(3), vec![0.0, 1.0]);
        index.add_chunk("about refunds", "faq.pdf", None, vec![0.9, 0.1]);

        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "about returns");
        assert_eq!(results[1].content, "about refunds");
    }

    #[test]
    fn test_status_and_document_count() {
        let dir = tempdir().unwrap();
        let mut index = DocumentIndex::open(dir.path()).unwrap();
        assert!(!index.status().initialized);

        index.add_chunk("a", "one.pdf", None, vec![1.0]);
        index.add_chunk("b", "one.pdf", None, vec![1.0]);
        index.add_chunk("c", "two.pdf", None, vec![1.0]);

        let status = index.status();
        assert!(status.initialized);
        assert_eq!(status.document_count, 2);
    }

    #[test]
    fn test_persist_and_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut index = DocumentIndex::open(dir.path()).unwrap();
            index.add_chunk("persisted chunk", "doc.pdf", Some(1), vec![0.5, 0.5]);
            index.persist().unwrap();
        }

        let index = DocumentIndex::open(dir.path()).unwrap();
        assert_eq!(index.status().document_count, 1);
        assert_eq!(index.search(&[0.5, 0.5], 1)[0].content, "persisted chunk");
    }

    fn config_for(base: &str) -> AssistantConfig {
        AssistantConfig {
            api_base: base.to_string(),
            api_key: String::new(),
            generation_model: "gen".to_string(),
            embedding_model: "embed".to_string(),
            db_url: ":memory:".to_string(),
            cache_dir: "./cache".to_string(),
            top_k: 2,
            temperature: 0.6,
            max_tokens: 400,
            cache_similarity_threshold: 0.8,
            session_timeout_secs: 3600,
            num_suggestions: 2,
        }
    }

    #[tokio::test]
    async fn test_retriever_empty_index() {
        let dir = tempdir().unwrap();
        let index = DocumentIndex::open(dir.path()).unwrap();
        let embedder = EmbeddingClient::new(&config_for("http://127.0.0.1:1/v1"));
        let retriever = DocumentRetriever::new(index, embedder, 2);

        let err = retriever.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, AssistantError::IndexNotReady));
    }

    #[tokio::test]
    async fn test_retriever_top_k() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(serde_json::json!({
                    "data": [{"embedding": [1.0, 0.0]}]
                }));
            })
            .await;

        let dir = tempdir().unwrap();
        let mut index = DocumentIndex::open(dir.path()).unwrap();
        index.add_chunk("close match", "a.pdf", None, vec![0.9, 0.1]);
        index.add_chunk("far match", "b.pdf", None, vec![0.0, 1.0]);
        index.add_chunk("exact match", "c.pdf", Some(7), vec![1.0, 0.0]);

        let embedder = EmbeddingClient::new(&config_for(&server.base_url()));
        let retriever = DocumentRetriever::new(index, embedder, 2);

        let chunks = retriever.retrieve("question").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "exact match");
        assert_eq!(chunks[0].metadata.total_pages, Some(7));
        assert_eq!(chunks[1].content, "close match");
    }
}
