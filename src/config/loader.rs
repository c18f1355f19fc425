//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{CoreError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP_)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| CoreError::ConfigurationInvalid(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| CoreError::ConfigurationInvalid(e.to_string()))?;

    app_config.validate()?;
    Ok(app_config)
}

/// Load configuration from environment variables only
///
/// Reads `.env` if present, picks up the ESI token and character id,
/// and leaves everything else at its default.
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut app_config = AppConfig::default();
    if let Ok(token) = std::env::var("ESI_ACCESS_TOKEN") {
        app_config.esi.access_token = Some(token);
    }
    if let Ok(raw) = std::env::var("ESI_CHARACTER_ID") {
        let character_id = raw.parse().map_err(|_| {
            CoreError::ConfigurationInvalid(format!("ESI_CHARACTER_ID is not numeric: {raw}"))
        })?;
        app_config.esi.character_id = Some(character_id);
    }
    if let Ok(url) = std::env::var("ESI_BASE_URL") {
        app_config.esi.base_url = url;
    }

    app_config.validate()?;
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.hubs.len(), 5);
        assert_eq!(config.refresh_interval_secs, 300);
    }
}
