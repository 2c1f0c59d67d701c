//! # docchat Chain
//!
//! The conversational retrieval pipeline: retrieve chunks for a question,
//! compose them into a context block, render the system message and
//! prompt, expand caller-supplied history, and invoke the completion
//! provider, optionally streaming tokens to a sink.
//!
//! Each stage is a plain struct or function; [`Pipeline`] wires them
//! together with direct sequential calls.

pub mod composer;
pub mod history;
pub mod invoker;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod stop;

#[cfg(test)]
mod test_helpers;

pub use composer::compose;
pub use history::{HistoryEntry, expand, expand_turns};
pub use invoker::{CompletionInput, CompletionInvoker, CompletionOptions};
pub use pipeline::{Answer, AskOptions, Pipeline, PipelineSettings, PipelineState};
pub use prompt::{PromptAssembler, render_template};
pub use retriever::SimilarityRetriever;
