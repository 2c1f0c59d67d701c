//! `docchat doctor`: diagnose config, index and provider health.

use docchat_core::index::VectorIndex;
use std::path::Path;

use crate::app;

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    println!("docchat doctor: system diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    if !config_path.exists() {
        println!("  ⚠️  No config file at {}; using defaults (run `docchat init`)", config_path.display());
    }

    let config = match app::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e:#}");
            println!("\n  ⚠️  1 issue found. Fix the config and run doctor again.");
            return Ok(());
        }
    };

    let provider = match app::build_provider(&config) {
        Ok(provider) => {
            println!("  ✅ Provider '{}' ready", provider.name());
            Some(provider)
        }
        Err(e) => {
            println!("  ❌ Provider: {e:#}");
            issues += 1;
            None
        }
    };

    let index_path = &config.retrieval.index_path;
    if !index_path.exists() {
        println!("  ❌ No index file at {}", index_path.display());
        issues += 1;
    } else if let Some(provider) = &provider {
        match app::load_index(&config, provider.clone()) {
            Ok(index) if index.is_empty() => {
                println!("  ⚠️  Index loaded but holds no chunks");
                issues += 1;
            }
            Ok(index) => println!(
                "  ✅ Index loaded: {} chunks, {} dimensions",
                index.len(),
                index.dimension().unwrap_or(0)
            ),
            Err(e) => {
                println!("  ❌ Index: {e:#}");
                issues += 1;
            }
        }
    }

    if let Some(provider) = &provider {
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider reachable"),
            Ok(false) => {
                println!("  ❌ Provider did not answer its health check");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider unreachable: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
