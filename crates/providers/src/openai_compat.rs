//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, Azure-style proxies, OpenRouter, Ollama, vLLM,
//! llama.cpp server, and any endpoint exposing `/v1/chat/completions`.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Embeddings for query-time retrieval
//! - Health checks

use async_trait::async_trait;
use docchat_core::error::CompletionError;
use docchat_core::message::Message;
use docchat_core::provider::*;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::sse::{SseDecoder, SseEvent};

/// Retry hint used when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible LLM provider.
///
/// Holds no per-request state; one instance can serve many concurrent
/// requests.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider with a 120s request timeout.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, Duration::from_secs(120))
    }

    /// Create a provider with an explicit request timeout.
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert the context messages plus the primary prompt to API format.
    ///
    /// The prompt always becomes the final `user` message.
    fn to_api_messages(messages: &[Message], prompt: &str) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
                refusal: None,
            })
            .chain(std::iter::once(ApiMessage {
                role: "user".into(),
                content: Some(prompt.to_string()),
                refusal: None,
            }))
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages, &request.prompt),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        body
    }

    /// POST a JSON body and turn non-200 statuses into typed errors.
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        accept_sse: bool,
    ) -> Result<reqwest::Response, CompletionError> {
        let url = format!("{}/{path}", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if accept_sse {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(body).send().await.map_err(transport_error)?;
        check_status(response).await
    }
}

/// Classify a reqwest failure: timeouts are surfaced separately from
/// every other transport problem.
fn transport_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else {
        CompletionError::Transport(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CompletionError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(CompletionError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(CompletionError::Authentication(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if status != 200 {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Provider returned error");
        return Err(CompletionError::Api {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

#[async_trait]
impl docchat_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, CompletionError> {
        let body = Self::request_body(&request, false);

        debug!(
            provider = %self.name,
            model = %request.model,
            context_messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self.post("chat/completions", &body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| CompletionError::Api {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| CompletionError::Api {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        if let Some(raw) = choice.message.refusal.filter(|r| !r.is_empty()) {
            return Err(CompletionError::Refusal { raw });
        }

        let content = choice.message.content.unwrap_or_default();
        if choice.finish_reason.as_deref() == Some("content_filter") && content.is_empty() {
            return Err(CompletionError::Refusal {
                raw: "content_filter".into(),
            });
        }

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message: Message::assistant(content),
            usage,
            model: api_response.model,
            finish_reason: choice.finish_reason,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, CompletionError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, CompletionError> {
        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self.post("embeddings", &body, false).await?;

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| CompletionError::Api {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        let embeddings = api_resp.data.into_iter().map(|d| d.embedding).collect();

        let usage = api_resp.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: 0,
            total_tokens: u.total_tokens,
        });

        Ok(EmbeddingResponse {
            embeddings,
            model: api_resp.model,
            usage,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, CompletionError> {
        let body = Self::request_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post("chat/completions", &body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream on its own task. Dropping `response`
        // (by returning) releases the connection.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut refusal = String::new();
            let mut produced_content = false;
            let mut last_usage: Option<Usage> = None;

            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        debug!(provider = %provider_name, "Stream receiver dropped, closing connection");
                        return;
                    }
                    next = byte_stream.next() => next,
                };

                let Some(chunk_result) = next else { break };

                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let err = if e.is_timeout() {
                            CompletionError::Timeout(e.to_string())
                        } else {
                            CompletionError::StreamInterrupted(e.to_string())
                        };
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                };

                for event in decoder.push(&bytes) {
                    let data = match event {
                        SseEvent::Done => {
                            finish(&tx, &refusal, produced_content, last_usage).await;
                            return;
                        }
                        SseEvent::Data(data) => data,
                    };

                    let stream_resp = match serde_json::from_str::<StreamResponse>(&data) {
                        Ok(r) => r,
                        Err(e) => {
                            trace!(
                                provider = %provider_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                            continue;
                        }
                    };

                    if let Some(error) = stream_resp.error {
                        let _ = tx
                            .send(Err(CompletionError::Api {
                                status_code: 200,
                                message: error.to_string(),
                            }))
                            .await;
                        return;
                    }

                    if let Some(choice) = stream_resp.choices.first() {
                        if let Some(r) = &choice.delta.refusal {
                            refusal.push_str(r);
                        }

                        if let Some(content) = choice.delta.content.as_ref().filter(|c| !c.is_empty()) {
                            produced_content = true;
                            let chunk = StreamChunk {
                                content: Some(content.clone()),
                                done: false,
                                usage: None,
                            };
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // receiver dropped
                            }
                        }

                        if choice.finish_reason.as_deref() == Some("content_filter")
                            && !produced_content
                            && refusal.is_empty()
                        {
                            refusal.push_str("content_filter");
                        }
                    }

                    // Some servers repeat usage on every chunk; only a
                    // usage-only chunk (no choices) marks the end.
                    if let Some(usage) = stream_resp.usage {
                        last_usage = Some(Usage {
                            prompt_tokens: usage.prompt_tokens,
                            completion_tokens: usage.completion_tokens,
                            total_tokens: usage.total_tokens,
                        });
                        if stream_resp.choices.is_empty() {
                            finish(&tx, &refusal, produced_content, last_usage).await;
                            return;
                        }
                    }
                }
            }

            // Stream ended without [DONE]
            finish(&tx, &refusal, produced_content, last_usage).await;
        });

        Ok(rx)
    }
}

type ChunkSender =
    tokio::sync::mpsc::Sender<std::result::Result<StreamChunk, CompletionError>>;

/// Emit the terminal item of a stream: a refusal error when the model
/// declined without producing content, otherwise the `done` chunk.
async fn finish(tx: &ChunkSender, refusal: &str, produced_content: bool, usage: Option<Usage>) {
    let last = if !refusal.is_empty() && !produced_content {
        Err(CompletionError::Refusal {
            raw: refusal.to_string(),
        })
    } else {
        Ok(StreamChunk {
            content: None,
            done: true,
            usage,
        })
    };
    let _ = tx.send(last).await;
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    model: String,
    usage: Option<EmbeddingApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
