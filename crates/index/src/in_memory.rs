//! In-memory vector index: brute-force cosine search over loaded embeddings.
//!
//! The chunk set is fixed once the index is built, so searches take
//! `&self` and need no locking; share it across requests with `Arc`.

use async_trait::async_trait;
use docchat_core::error::RetrievalError;
use docchat_core::index::{DocumentChunk, QueryEmbedder, VectorIndex};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::file::IndexFile;
use crate::vector::rank_by_similarity;

/// A stored chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

pub struct InMemoryIndex {
    chunks: Vec<IndexedChunk>,
    dimension: Option<usize>,
    embedder: Arc<dyn QueryEmbedder>,
}

impl InMemoryIndex {
    /// Build an index from already-embedded chunks.
    pub fn new(
        chunks: Vec<IndexedChunk>,
        embedder: Arc<dyn QueryEmbedder>,
    ) -> Result<Self, RetrievalError> {
        let dimension = chunks.first().map(|c| c.embedding.len());
        if let (Some(dim), Some(bad)) = (
            dimension,
            chunks.iter().find(|c| Some(c.embedding.len()) != dimension),
        ) {
            return Err(RetrievalError::DimensionMismatch {
                expected: dim,
                actual: bad.embedding.len(),
            });
        }

        Ok(Self {
            chunks,
            dimension,
            embedder,
        })
    }

    /// Load a pre-built index file.
    pub fn load(path: &Path, embedder: Arc<dyn QueryEmbedder>) -> Result<Self, RetrievalError> {
        let file = IndexFile::read(path)?;

        let chunks: Vec<IndexedChunk> = file
            .chunks
            .into_iter()
            .map(|record| IndexedChunk {
                chunk: DocumentChunk {
                    id: record.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    text: record.text,
                    metadata: record.metadata,
                    score: 0.0,
                },
                embedding: record.embedding,
            })
            .collect();

        info!(
            path = %path.display(),
            chunks = chunks.len(),
            embedding_model = file.embedding_model.as_deref().unwrap_or("unknown"),
            "Loaded vector index"
        );

        Self::new(chunks, embedder)
    }

    /// Embedding dimension, or `None` for an empty index.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentChunk>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidK(k));
        }
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };

        let query_embedding = self.embedder.embed_query(query).await?;
        if query_embedding.len() != dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: query_embedding.len(),
            });
        }

        let ranked = rank_by_similarity(
            self.chunks.iter().map(|c| c.embedding.as_slice()),
            &query_embedding,
            k,
        );

        debug!(k, hits = ranked.len(), "Similarity search complete");

        Ok(ranked
            .into_iter()
            .map(|(i, score)| {
                let mut chunk = self.chunks[i].chunk.clone();
                chunk.score = score;
                chunk
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}
