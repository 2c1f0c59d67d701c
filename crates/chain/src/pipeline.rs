//! Question-answering pipeline.
//!
//! One request runs `Idle → Retrieving → Composing → Invoking → Done`,
//! or drops to `Failed` from whichever stage broke. Stages run strictly
//! in sequence; there is no retry and no partial result. Tokens already
//! streamed to a sink stay delivered.
//!
//! A [`Pipeline`] holds only shared read-only collaborators, so one
//! instance behind an `Arc` serves any number of concurrent requests.

use docchat_config::AppConfig;
use docchat_core::error::Result;
use docchat_core::index::{DocumentChunk, VectorIndex};
use docchat_core::provider::Provider;
use docchat_core::stream::{CancelSignal, TokenSink};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::composer::compose;
use crate::history::{HistoryEntry, expand};
use crate::invoker::{CompletionInput, CompletionInvoker, CompletionOptions};
use crate::prompt::PromptAssembler;
use crate::retriever::SimilarityRetriever;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Retrieving,
    Composing,
    Invoking,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::Composing => "composing",
            Self::Invoking => "invoking",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer text plus the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub source_chunks: Vec<DocumentChunk>,
}

/// Model and retrieval settings shared by every request.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
    /// Chunks retrieved per question.
    pub k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.0,
            max_tokens: None,
            stop: Vec::new(),
            k: 4,
        }
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stop: config.prompt.stop.clone(),
            k: config.retrieval.k,
        }
    }
}

/// Per-request streaming collaborators.
#[derive(Clone, Default)]
pub struct AskOptions {
    pub on_token: Option<Arc<dyn TokenSink>>,
    pub cancel: Option<CancelSignal>,
}

impl AskOptions {
    pub fn streaming(sink: Arc<dyn TokenSink>) -> Self {
        Self {
            on_token: Some(sink),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

pub struct Pipeline {
    retriever: SimilarityRetriever,
    prompts: PromptAssembler,
    invoker: CompletionInvoker,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn Provider>,
        prompts: PromptAssembler,
        settings: PipelineSettings,
    ) -> Self {
        let invoker = CompletionInvoker::new(provider, prompts.greeting());
        Self {
            retriever: SimilarityRetriever::new(index),
            prompts,
            invoker,
            settings,
        }
    }

    /// Wire a pipeline from loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let mut prompts = PromptAssembler::new();
        if let Some(persona) = &config.prompt.persona {
            prompts = prompts.with_persona(persona);
        }
        if let Some(greeting) = &config.prompt.greeting {
            prompts = prompts.with_greeting(greeting);
        }
        Self::new(index, provider, prompts, PipelineSettings::from(config))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn greeting(&self) -> &str {
        self.prompts.greeting()
    }

    /// Answer `question` given the caller's prior `history`.
    ///
    /// Any stage error is returned as-is inside [`docchat_core::Error`];
    /// use its `kind()` to tell them apart.
    pub async fn ask<E>(&self, question: &str, history: &[E], options: AskOptions) -> Result<Answer>
    where
        E: HistoryEntry + Sync,
    {
        let request_id = Uuid::new_v4().to_string();
        let mut run = Run::new(&request_id);

        match self.run_stages(&mut run, question, history, options).await {
            Ok(answer) => {
                run.advance(PipelineState::Done);
                info!(
                    request_id = %request_id,
                    sources = answer.source_chunks.len(),
                    chars = answer.answer.len(),
                    "Answer ready"
                );
                Ok(answer)
            }
            Err(e) => {
                let stage = run.state;
                run.advance(PipelineState::Failed);
                warn!(
                    request_id = %request_id,
                    stage = %stage,
                    kind = e.kind(),
                    error = %e,
                    "Pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn run_stages<E>(
        &self,
        run: &mut Run<'_>,
        question: &str,
        history: &[E],
        options: AskOptions,
    ) -> Result<Answer>
    where
        E: HistoryEntry + Sync,
    {
        run.advance(PipelineState::Retrieving);
        let source_chunks = self.retriever.retrieve(question, self.settings.k).await?;

        run.advance(PipelineState::Composing);
        let context = compose(&source_chunks);
        let system_message = self.prompts.render_system_message(&context)?;

        run.advance(PipelineState::Invoking);
        let history = expand(history)?;
        let prompt = self.prompts.render_user_prompt(question)?;

        let mut completion = CompletionOptions::new(&self.settings.model)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_stop(self.settings.stop.clone());
        if let Some(sink) = options.on_token {
            completion = completion.with_sink(sink);
        }
        if let Some(cancel) = options.cancel {
            completion = completion.with_cancel(cancel);
        }

        let answer = self
            .invoker
            .complete(
                CompletionInput {
                    system_message,
                    history,
                    prompt,
                },
                &completion,
            )
            .await?;

        Ok(Answer {
            answer,
            source_chunks,
        })
    }
}

/// Tracks and traces one request's state transitions.
struct Run<'a> {
    request_id: &'a str,
    state: PipelineState,
}

impl<'a> Run<'a> {
    fn new(request_id: &'a str) -> Self {
        Self {
            request_id,
            state: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug!(
            request_id = self.request_id,
            from = %self.state,
            to = %next,
            "Pipeline transition"
        );
        self.state = next;
    }
}
