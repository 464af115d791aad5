//! `taskpilot init`: write a starter config file.

use std::path::{Path, PathBuf};
use taskpilot_config::AppConfig;

pub fn run(config_path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    if !write_starter_config(&path, force)? {
        println!("Config already exists at: {}", path.display());
        println!("Edit it manually, or re-run with --force to overwrite it.");
        return Ok(());
    }

    println!("Created config at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set your API key: export OPENROUTER_API_KEY=sk-or-v1-...");
    println!("     (or add api_key = \"...\" to the config file)");
    println!("  2. Try it: taskpilot add buy milk");
    Ok(())
}

/// Write the default config to `path`. Returns `false` if a file exists and
/// `force` is not set.
fn write_starter_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
