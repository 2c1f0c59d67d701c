//! `docchat init`: write a default configuration file.

use anyhow::Context;
use docchat_config::AppConfig;
use std::path::Path;

pub fn run(config_path: &Path, force: bool) -> anyhow::Result<()> {
    println!("docchat: first-time setup");
    println!("=========================\n");

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        println!("  Created config directory: {}", dir.display());
    }

    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  (use --force to overwrite it with defaults)");
    } else {
        std::fs::write(config_path, AppConfig::default_toml())
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("  Wrote default config: {}", config_path.display());
    }

    let defaults = AppConfig::default();
    println!();
    println!("  Next steps:");
    println!("    1. Set DOCCHAT_API_KEY (or OPENAI_API_KEY), or add api_key to the config");
    println!(
        "    2. Place the index produced by your ingestion pipeline at {}",
        defaults.retrieval.index_path.display()
    );
    println!("    3. Run `docchat doctor`, then `docchat chat`");
    Ok(())
}
