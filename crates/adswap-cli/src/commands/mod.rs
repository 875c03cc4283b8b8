//! CLI subcommand implementations.

pub mod run;

use std::path::Path;

use adswap_engine::inventory;
use adswap_types::{AdSwapConfig, SwapError};

/// `adswap inventory`: list the creatives a folder parses into.
pub fn inventory(folder: &Path) -> Result<(), SwapError> {
    let creatives = inventory::load_creatives(folder)?;
    println!("{} creatives in {}", creatives.len(), folder.display());
    for creative in &creatives {
        let cap = match creative.usage_limit {
            Some(limit) => format!(" (cap {limit})"),
            None => String::new(),
        };
        println!("  {}  {}{}", creative.dimension, creative.id, cap);
    }
    Ok(())
}

/// `adswap config`: emit the default configuration as TOML.
pub fn write_default_config(target: Option<&Path>) -> Result<(), SwapError> {
    let toml_text = AdSwapConfig::default().to_toml()?;
    match target {
        Some(path) => {
            std::fs::write(path, &toml_text)
                .map_err(|e| SwapError::Config(format!("cannot write {}: {e}", path.display())))?;
            println!("wrote {}", path.display());
        }
        None => print!("{toml_text}"),
    }
    Ok(())
}
