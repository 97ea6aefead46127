use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mzaccess::accessor::AccessorConfig;

/// Parse and validate a config file, then print the decorator chain it builds
pub fn run(file: PathBuf) -> Result<()> {
    info!("Checking {}", file.display());

    let config = AccessorConfig::from_file(&file)
        .with_context(|| format!("Invalid config file: {}", file.display()))?;
    let chain = config
        .pipeline
        .decorators()
        .context("Failed to derive decorator chain")?;

    println!("Config OK: {}", file.display());
    println!();
    println!("Decorators (innermost first):");
    for (position, decorator) in chain.iter().enumerate() {
        println!("  {}. {}", position + 1, decorator);
    }
    println!();
    if config.cache.enabled {
        println!("Decoded cache: enabled (capacity {})", config.cache.capacity);
    } else {
        println!("Decoded cache: disabled");
    }
    println!("Hot index threshold: {}", config.cache.hot_index_threshold);

    Ok(())
}
