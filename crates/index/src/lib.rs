//! Vector index implementations for docchat.
//!
//! The index is produced by an external ingestion pipeline (PDF parsing,
//! chunking, embedding) and loaded here read-only.

pub mod embedder;
pub mod file;
pub mod in_memory;
pub mod vector;

pub use embedder::ProviderEmbedder;
pub use file::{IndexFile, IndexRecord};
pub use in_memory::{InMemoryIndex, IndexedChunk};
pub use vector::{cosine_similarity, rank_by_similarity};
