//! LLM provider implementations for docchat.
//!
//! All providers implement the `docchat_core::Provider` trait.
//! The router selects the configured provider.

pub mod openai_compat;
pub mod router;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
