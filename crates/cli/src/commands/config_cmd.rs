//! `docchat config`: print the effective configuration.

use docchat_config::AppConfig;
use std::path::Path;

use crate::app;

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = app::load_config(config_path)?;

    println!("Config file: {}", config_path.display());
    if !config_path.exists() {
        println!("  (not found, showing defaults; run `docchat init`)");
    }
    println!();
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &AppConfig) {
    let base = config
        .base_path
        .clone()
        .unwrap_or_else(|| docchat_providers::router::default_base_url(&config.provider));
    let key = if config.has_api_key() { "set" } else { "not set" };
    let max_tokens = config
        .max_tokens
        .map(|n| n.to_string())
        .unwrap_or_else(|| "provider default".into());

    println!("  Provider:     {} ({base})", config.provider);
    println!("  API key:      {key}");
    println!("  Model:        {}", config.model);
    println!("  Temperature:  {}", config.temperature);
    println!("  Max tokens:   {max_tokens}");
    println!("  Streaming:    {}", config.streaming);
    println!("  Index:        {}", config.retrieval.index_path.display());
    println!("  Embeddings:   {}", config.retrieval.embedding_model);
    println!("  Chunks (k):   {}", config.retrieval.k);
    println!(
        "  Persona:      {}",
        if config.prompt.persona.is_some() { "custom" } else { "built-in" }
    );
    if !config.prompt.stop.is_empty() {
        println!("  Stop:         {:?}", config.prompt.stop);
    }
    if !config.providers.is_empty() {
        let mut names: Vec<&str> = config.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        println!("  Providers:    {}", names.join(", "));
    }
}
