//! # docchat Core
//!
//! Domain types, collaborator traits, and error definitions for docchat,
//! a conversational question-answering layer over a pre-built vector
//! index of PDF-derived documents.
//!
//! The external collaborators (vector index, query embedder, completion
//! provider, token sink) are defined as traits here. Implementations
//! live in their respective crates, so the pipeline can be tested with
//! scripted stand-ins.

pub mod error;
pub mod index;
pub mod message;
pub mod provider;
pub mod stream;

// Re-export key types at crate root for ergonomics
pub use error::{
    CompletionError, Error, HistoryFormatError, Result, RetrievalError, TemplateError,
};
pub use index::{DocumentChunk, QueryEmbedder, VectorIndex};
pub use message::{ConversationTurn, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use stream::{CancelHandle, CancelSignal, ChannelSink, TokenSink, cancel_pair};
