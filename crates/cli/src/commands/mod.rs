pub mod chat;
pub mod onboard;
pub mod serve;

use parley_config::AppConfig;
use std::path::Path;
use tracing::info;

/// Load config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    let config = config.map_err(|e| format!("Failed to load config: {e}"))?;
    info!(
        path = ?path,
        provider = %config.default_provider,
        model = %config.default_model,
        "Configuration loaded"
    );
    Ok(config)
}
