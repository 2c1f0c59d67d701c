//! Provider trait: the abstraction over hosted completion endpoints.
//!
//! A Provider knows how to send a message sequence plus a primary prompt to
//! an LLM and get a response back, either as a complete message or as a
//! stream of tokens. It can also embed text for query-time retrieval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::CompletionError;
use crate::message::Message;

/// A single completion request. Built per call and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// Conversational context sent ahead of the prompt
    /// (system instruction, greeting, history)
    pub messages: Vec<Message>,

    /// The primary text input; sent as the final user message
    pub prompt: String,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

fn default_temperature() -> f32 {
    0.0
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Why generation ended ("stop", "length", "content_filter", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-3-small").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,

    /// Token usage.
    pub usage: Option<Usage>,
}

/// Receiving half of a provider stream.
pub type ChunkReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, CompletionError>>;

/// The core Provider trait.
///
/// The completion invoker calls `complete()` or `stream()` without knowing
/// which endpoint is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, CompletionError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Dropping the receiver tells the producer to stop reading and release
    /// the connection.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, CompletionError> {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx.send(Ok(StreamChunk {
            content: Some(response.message.content),
            done: false,
            usage: None,
        })).await;
        let _ = tx.send(Ok(StreamChunk {
            content: None,
            done: true,
            usage: response.usage,
        })).await;
        Ok(rx)
    }

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, CompletionError> {
        Err(CompletionError::NotConfigured(
            format!("Provider '{}' does not support embeddings", self.name()),
        ))
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, CompletionError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, CompletionError> {
            Ok(ProviderResponse {
                message: Message::assistant(request.prompt),
                usage: None,
                model: request.model,
                finish_reason: Some("stop".into()),
            })
        }
    }

    fn request(prompt: &str) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![],
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
            stream: false,
            stop: vec![],
        }
    }

    #[test]
    fn provider_request_defaults() {
        let req = request("hi");
        assert_eq!(req.temperature, 0.0);
        assert!(!req.stream);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("stop"));
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let mut rx = Echo.stream(request("whole answer")).await.unwrap();
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("whole answer"));
        assert!(rx.recv().await.unwrap().unwrap().done);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn default_embed_is_unsupported() {
        let err = Echo
            .embed(EmbeddingRequest { model: "m".into(), inputs: vec!["x".into()] })
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::NotConfigured(_)));
    }
}
