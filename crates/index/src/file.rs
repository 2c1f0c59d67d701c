//! On-disk format of a pre-built index, as written by the ingestion pipeline.
//!
//! ```json
//! {
//!   "embedding_model": "text-embedding-3-small",
//!   "chunks": [
//!     { "id": "citi-2021-p4-0", "text": "...", "metadata": { "source": "citi.pdf", "page": 4 },
//!       "embedding": [0.012, -0.33, ...] }
//!   ]
//! }
//! ```

use docchat_core::error::RetrievalError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    /// Model that produced the stored embeddings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    pub chunks: Vec<IndexRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Chunk identifier; generated on load when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub text: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    pub embedding: Vec<f32>,
}

impl IndexFile {
    /// Read and parse an index file.
    ///
    /// Any failure means the index cannot serve queries and is reported
    /// as [`RetrievalError::IndexUnavailable`].
    pub fn read(path: &Path) -> Result<Self, RetrievalError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::IndexUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;

        let file: Self = serde_json::from_str(&content).map_err(|e| {
            RetrievalError::IndexUnavailable(format!("cannot parse {}: {e}", path.display()))
        })?;

        file.check_dimensions()?;
        Ok(file)
    }

    /// Every record must carry a non-empty embedding of the same length.
    fn check_dimensions(&self) -> Result<(), RetrievalError> {
        let Some(first) = self.chunks.first() else {
            return Ok(());
        };
        let dim = first.embedding.len();
        if dim == 0 {
            return Err(RetrievalError::IndexUnavailable(
                "index records have empty embeddings".into(),
            ));
        }
        if let Some((i, bad)) = self
            .chunks
            .iter()
            .enumerate()
            .find(|(_, r)| r.embedding.len() != dim)
        {
            return Err(RetrievalError::IndexUnavailable(format!(
                "record {i} has {} dimensions, expected {dim}",
                bad.embedding.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("index.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{"embedding_model":"text-embedding-3-small","chunks":[
                {"id":"a","text":"Citi pledged $1T...","metadata":{"source":"citi.pdf"},"embedding":[1.0,0.0]},
                {"text":"Citi's targets include...","embedding":[0.0,1.0]}
            ]}"#,
        );
        let file = IndexFile::read(&path).unwrap();
        assert_eq!(file.chunks.len(), 2);
        assert_eq!(file.embedding_model.as_deref(), Some("text-embedding-3-small"));
        assert!(file.chunks[1].id.is_none());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = IndexFile::read(Path::new("/nonexistent/index.json")).unwrap_err();
        assert!(matches!(err, RetrievalError::IndexUnavailable(_)));
    }

    #[test]
    fn ragged_dimensions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{"chunks":[{"text":"a","embedding":[1.0,0.0]},{"text":"b","embedding":[1.0]}]}"#,
        );
        let err = IndexFile::read(&path).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn garbage_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "not json");
        assert!(matches!(
            IndexFile::read(&path),
            Err(RetrievalError::IndexUnavailable(_))
        ));
    }
}
