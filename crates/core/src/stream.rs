//! Streaming collaborators: the token sink and request cancellation.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Receives generated tokens, once per token, in generation order.
///
/// Never invoked in non-streaming mode; may be invoked many times in
/// rapid succession while streaming.
pub trait TokenSink: Send + Sync {
    fn on_token(&self, token: &str);
}

impl<F> TokenSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_token(&self, token: &str) {
        self(token)
    }
}

/// Forwards tokens into an unbounded channel, e.g. for an SSE or
/// WebSocket writer running on another task.
pub struct ChannelSink(pub mpsc::UnboundedSender<String>);

impl TokenSink for ChannelSink {
    fn on_token(&self, token: &str) {
        // A closed receiver means the consumer went away; the request's
        // own cancellation path handles shutting down the stream.
        let _ = self.0.send(token.to_string());
    }
}

/// Create a linked cancel handle / signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// The caller's side: fires cancellation.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// The worker's side: observed while a request is in flight.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if every
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
