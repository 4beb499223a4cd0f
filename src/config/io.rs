use super::models::AppConfig;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Load configuration from the given TOML file.
///
/// A missing or invalid file falls back to defaults so the reader can still
/// launch.
pub fn load_config(path: &Path) -> AppConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        info!(path = %path.display(), "No config file; using defaults");
        return AppConfig::default();
    };
    match parse_config(&contents) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                path = %path.display(),
                "Invalid config TOML; falling back to defaults: {err}"
            );
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(config)
}
