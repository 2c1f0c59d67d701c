//! Completion invoker.
//!
//! Sends `[system, greeting, history...]` plus the rendered prompt to the
//! provider. Each call builds its own immutable request; the shared
//! provider is never reconfigured between calls.

use docchat_core::error::CompletionError;
use docchat_core::message::Message;
use docchat_core::provider::{Provider, ProviderRequest};
use docchat_core::stream::{CancelSignal, TokenSink};
use std::sync::Arc;
use tracing::{debug, info};

use crate::stop::{StopScanner, truncate_at_stop};

/// What to send for one completion.
#[derive(Debug, Clone)]
pub struct CompletionInput {
    pub system_message: String,
    pub history: Vec<Message>,
    pub prompt: String,
}

/// Per-call model settings and streaming collaborators.
#[derive(Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
    /// Presence switches the call to streaming mode.
    pub on_token: Option<Arc<dyn TokenSink>>,
    pub cancel: Option<CancelSignal>,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            stop: Vec::new(),
            on_token: None,
            cancel: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.on_token = Some(sink);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.on_token.is_some()
    }
}

impl std::fmt::Debug for CompletionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionOptions")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("stop", &self.stop)
            .field("streaming", &self.is_streaming())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

pub struct CompletionInvoker {
    provider: Arc<dyn Provider>,
    greeting: String,
}

impl CompletionInvoker {
    pub fn new(provider: Arc<dyn Provider>, greeting: impl Into<String>) -> Self {
        Self {
            provider,
            greeting: greeting.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// `[system, greeting, history...]`; the prompt travels separately.
    pub fn message_sequence(&self, input: &CompletionInput) -> Vec<Message> {
        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(Message::system(&input.system_message));
        messages.push(Message::assistant(&self.greeting));
        messages.extend(input.history.iter().cloned());
        messages
    }

    /// Run one completion and return the full answer text.
    ///
    /// With a token sink the answer is streamed: every released piece is
    /// handed to the sink in order, and their concatenation equals the
    /// returned string.
    pub async fn complete(
        &self,
        input: CompletionInput,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let mut cancel = options.cancel.clone();
        if cancel.as_ref().is_some_and(CancelSignal::is_cancelled) {
            return Err(CompletionError::Cancelled);
        }

        let request = ProviderRequest {
            model: options.model.clone(),
            messages: self.message_sequence(&input),
            prompt: input.prompt,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: options.is_streaming(),
            stop: options.stop.clone(),
        };

        debug!(
            provider = self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            streaming = request.stream,
            "Dispatching completion"
        );

        let answer = match &options.on_token {
            Some(sink) => {
                self.stream_into(request, &options.stop, sink.as_ref(), &mut cancel)
                    .await?
            }
            None => {
                let response = tokio::select! {
                    biased;
                    _ = wait_cancelled(&mut cancel) => return Err(CompletionError::Cancelled),
                    response = self.provider.complete(request) => response?,
                };
                truncate_at_stop(&response.message.content, &options.stop)
            }
        };

        info!(
            provider = self.provider.name(),
            chars = answer.len(),
            "Completion finished"
        );
        Ok(answer)
    }

    async fn stream_into(
        &self,
        request: ProviderRequest,
        stop: &[String],
        sink: &dyn TokenSink,
        cancel: &mut Option<CancelSignal>,
    ) -> Result<String, CompletionError> {
        let mut rx = tokio::select! {
            biased;
            _ = wait_cancelled(cancel) => return Err(CompletionError::Cancelled),
            rx = self.provider.stream(request) => rx?,
        };

        let mut scanner = StopScanner::new(stop);
        let mut answer = String::new();
        let mut deliver = |text: &str| {
            if !text.is_empty() {
                sink.on_token(text);
                answer.push_str(text);
            }
        };

        loop {
            // Returning drops `rx`; the reader task sees the closed
            // channel and releases the connection.
            let item = tokio::select! {
                biased;
                _ = wait_cancelled(cancel) => {
                    debug!("Completion cancelled mid-stream");
                    return Err(CompletionError::Cancelled);
                }
                item = rx.recv() => item,
            };

            match item {
                Some(Ok(chunk)) => {
                    if let Some(text) = chunk.content {
                        let scanned = scanner.push(&text);
                        deliver(&scanned.emit);
                        if scanned.stopped {
                            debug!("Stop sequence reached, closing stream");
                            break;
                        }
                    }
                    if chunk.done {
                        break;
                    }
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        deliver(&scanner.finish());
        Ok(answer)
    }
}

/// Resolves on cancellation; pends forever when there is no signal.
async fn wait_cancelled(cancel: &mut Option<CancelSignal>) {
    match cancel {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, collecting_sink};
    use docchat_core::message::Role;
    use docchat_core::stream::cancel_pair;
    use std::time::Duration;

    fn input(history: Vec<Message>) -> CompletionInput {
        CompletionInput {
            system_message: "SYSTEM".into(),
            history,
            prompt: "What are Citi's climate commitments?".into(),
        }
    }

    #[test]
    fn sequence_is_system_greeting_history() {
        let invoker = CompletionInvoker::new(Arc::new(ScriptedProvider::text("x")), "Hi!");
        let seq = invoker.message_sequence(&input(vec![
            Message::user("q1"),
            Message::assistant("a1"),
        ]));
        let roles: Vec<Role> = seq.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(seq[0].content, "SYSTEM");
        assert_eq!(seq[1].content, "Hi!");
    }

    #[tokio::test]
    async fn non_streaming_returns_remote_text() {
        let provider = Arc::new(ScriptedProvider::text("Citi committed to net zero by 2050."));
        let invoker = CompletionInvoker::new(provider.clone(), "Hi!");
        let options = CompletionOptions::new("gpt-4o-mini");

        let answer = invoker.complete(input(vec![]), &options).await.unwrap();
        assert_eq!(answer, "Citi committed to net zero by 2050.");

        let req = provider.last_request().unwrap();
        assert!(!req.stream);
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.prompt, "What are Citi's climate commitments?");
    }

    #[tokio::test]
    async fn streaming_concatenation_equals_answer() {
        let provider = Arc::new(ScriptedProvider::tokens(&["Net", " zero", " by", " 2050", "."]));
        let invoker = CompletionInvoker::new(provider.clone(), "Hi!");
        let (sink, seen) = collecting_sink();
        let options = CompletionOptions::new("gpt-4o-mini").with_sink(sink);

        let answer = invoker.complete(input(vec![]), &options).await.unwrap();
        assert_eq!(answer, "Net zero by 2050.");
        assert_eq!(seen.lock().unwrap().concat(), answer);
        assert_eq!(seen.lock().unwrap().len(), 5);
        assert!(provider.last_request().unwrap().stream);
    }

    #[tokio::test]
    async fn streaming_honours_stop_sequences() {
        let provider = Arc::new(ScriptedProvider::tokens(&["Answer", " done", "\nHu", "man: more"]));
        let invoker = CompletionInvoker::new(provider.clone(), "Hi!");
        let (sink, seen) = collecting_sink();
        let options = CompletionOptions::new("m")
            .with_stop(vec!["\nHuman:".into()])
            .with_sink(sink);

        let answer = invoker.complete(input(vec![]), &options).await.unwrap();
        assert_eq!(answer, "Answer done");
        assert_eq!(seen.lock().unwrap().concat(), answer);
        assert_eq!(provider.last_request().unwrap().stop, vec!["\nHuman:".to_string()]);
    }

    #[tokio::test]
    async fn non_streaming_truncates_at_stop() {
        let provider = Arc::new(ScriptedProvider::text("Summary.\n###\nextra"));
        let invoker = CompletionInvoker::new(provider, "Hi!");
        let options = CompletionOptions::new("m").with_stop(vec!["###".into()]);
        assert_eq!(invoker.complete(input(vec![]), &options).await.unwrap(), "Summary.\n");
    }

    #[tokio::test]
    async fn errors_propagate_unchanged() {
        let provider = Arc::new(ScriptedProvider::failing(CompletionError::RateLimited {
            retry_after_secs: 30,
        }));
        let invoker = CompletionInvoker::new(provider, "Hi!");
        let err = invoker
            .complete(input(vec![]), &CompletionOptions::new("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::RateLimited { retry_after_secs: 30 }));
    }

    #[tokio::test]
    async fn stream_error_after_tokens_keeps_delivered_tokens() {
        let provider = Arc::new(
            ScriptedProvider::tokens(&["partial", " answer"])
                .then_error(CompletionError::StreamInterrupted("connection reset".into())),
        );
        let invoker = CompletionInvoker::new(provider, "Hi!");
        let (sink, seen) = collecting_sink();
        let err = invoker
            .complete(input(vec![]), &CompletionOptions::new("m").with_sink(sink))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::StreamInterrupted(_)));
        assert_eq!(seen.lock().unwrap().concat(), "partial answer");
    }

    #[tokio::test]
    async fn already_cancelled_never_calls_provider() {
        let provider = Arc::new(ScriptedProvider::text("x"));
        let invoker = CompletionInvoker::new(provider.clone(), "Hi!");
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let err = invoker
            .complete(input(vec![]), &CompletionOptions::new("m").with_cancel(signal))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn cancel_mid_stream_releases_producer() {
        let provider = Arc::new(ScriptedProvider::endless("tok "));
        let invoker = CompletionInvoker::new(provider.clone(), "Hi!");
        let (handle, signal) = cancel_pair();
        let (sink, seen) = collecting_sink();
        let options = CompletionOptions::new("m").with_sink(sink).with_cancel(signal);

        let task = tokio::spawn(async move { invoker.complete(input(vec![]), &options).await });
        while seen.lock().unwrap().len() < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(CompletionError::Cancelled)));

        // The producer notices the dropped receiver and stops.
        tokio::time::timeout(Duration::from_secs(2), provider.wait_released())
            .await
            .unwrap();
    }
}
