pub mod chat;
pub mod init;
pub mod memory;

use std::path::Path;

use llmpu_config::AppConfig;

/// Load config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides()?;
            config.validate()?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}
