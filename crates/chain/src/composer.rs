//! Context composer: joins retrieved chunks into one context block.

use docchat_core::index::DocumentChunk;

/// Exactly one blank line between chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join chunk texts in retrieval order. No chunks → empty string.
pub fn compose(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
