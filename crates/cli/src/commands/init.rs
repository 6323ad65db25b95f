//! `llmpu init` — write a default configuration file.

use std::path::PathBuf;

use llmpu_config::AppConfig;

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run `llmpu init`.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Created config at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Point `host` at your OpenAI-compatible server");
    println!("  2. Pick a `prompt_format` (alpaca, llama3, llama3_instruct, llama3_chat, oaichat)");
    println!("  3. Run: llmpu chat");

    Ok(())
}
