//! Scripted collaborators shared by the chain tests.

use async_trait::async_trait;
use docchat_core::error::{CompletionError, RetrievalError};
use docchat_core::index::{DocumentChunk, VectorIndex};
use docchat_core::message::Message;
use docchat_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};
use docchat_core::stream::TokenSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

enum Script {
    Tokens {
        tokens: Vec<String>,
        trailing_error: Option<CompletionError>,
    },
    Fail(CompletionError),
    Endless(String),
}

/// A provider that replays a fixed script and records every request.
pub struct ScriptedProvider {
    script: Script,
    requests: Mutex<Vec<ProviderRequest>>,
    released: Arc<Notify>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
            released: Arc::new(Notify::new()),
        }
    }

    /// Answers with `text`, streamed as a single token.
    pub fn text(text: &str) -> Self {
        Self::tokens(&[text])
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self::with_script(Script::Tokens {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            trailing_error: None,
        })
    }

    /// Every call fails with `error`.
    pub fn failing(error: CompletionError) -> Self {
        Self::with_script(Script::Fail(error))
    }

    /// Streams `token` until the receiver goes away.
    pub fn endless(token: &str) -> Self {
        Self::with_script(Script::Endless(token.to_string()))
    }

    /// End the token stream with `error` instead of a done chunk.
    pub fn then_error(mut self, error: CompletionError) -> Self {
        if let Script::Tokens { trailing_error, .. } = &mut self.script {
            *trailing_error = Some(error);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Resolves once an endless stream has seen its receiver dropped.
    pub async fn wait_released(&self) {
        self.released.notified().await;
    }

    fn record(&self, request: ProviderRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CompletionError> {
        let model = request.model.clone();
        self.record(request);
        match &self.script {
            Script::Tokens { tokens, .. } => Ok(ProviderResponse {
                message: Message::assistant(tokens.concat()),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model,
                finish_reason: Some("stop".into()),
            }),
            Script::Fail(e) => Err(e.clone()),
            Script::Endless(_) => panic!("ScriptedProvider: endless script only streams"),
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, CompletionError> {
        self.record(request);
        let (tx, rx) = mpsc::channel(4);

        match &self.script {
            Script::Fail(e) => return Err(e.clone()),
            Script::Tokens {
                tokens,
                trailing_error,
            } => {
                let tokens = tokens.clone();
                let trailing_error = trailing_error.clone();
                tokio::spawn(async move {
                    for token in tokens {
                        let chunk = StreamChunk {
                            content: Some(token),
                            ..Default::default()
                        };
                        if tx.send(Ok(chunk)).await.is_err() {
                            return;
                        }
                    }
                    let last = match trailing_error {
                        Some(e) => Err(e),
                        None => Ok(StreamChunk {
                            done: true,
                            ..Default::default()
                        }),
                    };
                    let _ = tx.send(last).await;
                });
            }
            Script::Endless(token) => {
                let token = token.clone();
                let released = self.released.clone();
                tokio::spawn(async move {
                    loop {
                        let chunk = StreamChunk {
                            content: Some(token.clone()),
                            ..Default::default()
                        };
                        if tx.send(Ok(chunk)).await.is_err() {
                            break;
                        }
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                    released.notify_one();
                });
            }
        }
        Ok(rx)
    }
}

/// An index that returns the first `k` of a fixed chunk list.
pub struct StaticIndex {
    chunks: Option<Vec<DocumentChunk>>,
    calls: AtomicUsize,
}

impl StaticIndex {
    pub fn texts(texts: &[&str]) -> Self {
        Self {
            chunks: Some(
                texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let mut chunk = DocumentChunk::new(format!("chunk-{i}"), *t);
                        chunk.score = 1.0 - i as f32 * 0.1;
                        chunk
                    })
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every search fails with `IndexUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            chunks: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    fn name(&self) -> &str {
        "static"
    }

    async fn similarity_search(
        &self,
        _query: &str,
        k: usize,
    ) -> Result<Vec<DocumentChunk>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.chunks {
            Some(chunks) => Ok(chunks.iter().take(k).cloned().collect()),
            None => Err(RetrievalError::IndexUnavailable("index file missing".into())),
        }
    }

    fn len(&self) -> usize {
        self.chunks.as_ref().map_or(0, Vec::len)
    }
}

/// A sink that records every token it receives.
pub fn collecting_sink() -> (Arc<dyn TokenSink>, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let inner = seen.clone();
    let sink: Arc<dyn TokenSink> = Arc::new(move |token: &str| {
        inner.lock().unwrap().push(token.to_string());
    });
    (sink, seen)
}
