//! Vector index traits: read-only similarity search over document chunks.
//!
//! The index is built and persisted by an external ingestion pipeline.
//! docchat only queries it, possibly from many requests at once, so
//! implementations must be safe for concurrent read-only use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// A single retrieved chunk of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Opaque chunk identifier assigned by the index
    pub id: String,

    /// The chunk's text content
    pub text: String,

    /// Source metadata (file name, page, ...) as stored by the ingestion pipeline
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Similarity to the query (set by search operations)
    #[serde(default)]
    pub score: f32,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: serde_json::Map::new(),
            score: 0.0,
        }
    }

    /// Human-readable source label, taken from the `source` metadata key
    /// when the ingestion pipeline recorded one.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// The similarity-search contract of a vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The index name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return at most `k` chunks, ordered by descending similarity to `query`.
    ///
    /// Order among equal scores is unspecified.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<Vec<DocumentChunk>, RetrievalError>;

    /// Number of chunks stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns a query string into the embedding space of an index.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed_query(&self, text: &str) -> std::result::Result<Vec<f32>, RetrievalError>;
}
