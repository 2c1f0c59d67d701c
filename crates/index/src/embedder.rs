//! Query embedding through a completion provider's embeddings endpoint.

use async_trait::async_trait;
use docchat_core::error::RetrievalError;
use docchat_core::index::QueryEmbedder;
use docchat_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;

/// Embeds queries with the same model the ingestion pipeline used.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl QueryEmbedder for ProviderEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("provider returned no embedding".into()))
    }
}
