//! Wiring shared by the commands: config, provider, index and pipeline.

use anyhow::{Context, bail};
use docchat_chain::Pipeline;
use docchat_config::AppConfig;
use docchat_core::index::DocumentChunk;
use docchat_core::provider::Provider;
use docchat_core::stream::{CancelHandle, TokenSink};
use docchat_index::{InMemoryIndex, ProviderEmbedder};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn default_config_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_with_env(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Providers that run locally and accept requests without a key.
fn needs_api_key(config: &AppConfig) -> bool {
    !matches!(config.provider.as_str(), "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

pub fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn Provider>> {
    if needs_api_key(config) && !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DOCCHAT_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", default_config_path().display());
        eprintln!();
        bail!("No API key found. See above for setup instructions.");
    }

    docchat_providers::build_from_config(config)
        .default()
        .with_context(|| format!("Provider '{}' is not configured", config.provider))
}

/// Load the pre-built index, embedding queries through `provider`.
pub fn load_index(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> anyhow::Result<Arc<InMemoryIndex>> {
    let embedder = ProviderEmbedder::new(provider, &config.retrieval.embedding_model);
    let index = InMemoryIndex::load(&config.retrieval.index_path, Arc::new(embedder))
        .with_context(|| {
            format!(
                "Failed to load index from {}",
                config.retrieval.index_path.display()
            )
        })?;
    Ok(Arc::new(index))
}

pub fn build_pipeline(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let provider = build_provider(config)?;
    let index = load_index(config, provider.clone())?;
    Ok(Pipeline::from_config(config, index, provider))
}

/// Run `fut`, cancelling it through `handle` when Ctrl+C arrives.
pub async fn with_ctrl_c<F: Future>(fut: F, handle: CancelHandle) -> F::Output {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            out = &mut fut => return out,
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    handle.cancel();
                }
            }
        }
    }
}

/// Writes tokens to stdout as they arrive.
pub struct StdoutSink;

impl TokenSink for StdoutSink {
    fn on_token(&self, token: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(token.as_bytes());
        let _ = out.flush();
    }
}

/// Read a `[["question", "answer"], ...]` history file.
pub fn read_history(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("History file {} is not a list of string lists", path.display()))
}

pub fn print_sources(chunks: &[DocumentChunk]) {
    if chunks.is_empty() {
        println!("  (no source chunks retrieved)");
        return;
    }
    println!("  Sources:");
    for (i, chunk) in chunks.iter().enumerate() {
        let label = chunk.source().unwrap_or(chunk.id.as_str());
        let page = chunk
            .metadata
            .get("page")
            .map(|p| format!(" p.{p}"))
            .unwrap_or_default();
        println!("  [{}] {label}{page} (score {:.3})", i + 1, chunk.score);
        println!("      {}", preview(&chunk.text, 100));
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short text", 100), "short text");
        assert_eq!(preview("émissions nettes", 4), "émis...");
        assert_eq!(preview("a\n\n  b", 10), "a b");
    }

    #[test]
    fn local_providers_skip_key_check() {
        let mut config = AppConfig::default();
        assert!(needs_api_key(&config));
        config.provider = "ollama".into();
        assert!(!needs_api_key(&config));
    }

    #[test]
    fn provider_section_key_builds_provider() {
        let mut config = AppConfig {
            api_key: None,
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            docchat_config::ProviderConfig {
                api_key: Some("sk-prov".into()),
                api_url: None,
            },
        );
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn history_file_parses_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"[["hi","hello"],["bye","goodbye"]]"#).unwrap();
        let history = read_history(&path).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], vec!["bye".to_string(), "goodbye".to_string()]);
    }

    #[test]
    fn history_file_wrong_shape_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"{"turns": []}"#).unwrap();
        assert!(read_history(&path).is_err());
    }
}
