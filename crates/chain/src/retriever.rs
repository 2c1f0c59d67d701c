//! Similarity retriever, the first pipeline stage.

use docchat_core::error::RetrievalError;
use docchat_core::index::{DocumentChunk, VectorIndex};
use std::sync::Arc;
use tracing::debug;

/// Thin wrapper over a shared, read-only vector index.
#[derive(Clone)]
pub struct SimilarityRetriever {
    index: Arc<dyn VectorIndex>,
}

impl SimilarityRetriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Return at most `k` chunks, most similar first.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentChunk>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidK(k));
        }

        let mut chunks = self.index.similarity_search(query, k).await?;
        chunks.truncate(k);

        debug!(index = self.index.name(), k, retrieved = chunks.len(), "Retrieved chunks");
        Ok(chunks)
    }
}
