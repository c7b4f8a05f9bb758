//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, TraderError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP_)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    // Add default config file if it exists
    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    // Add environment variables with APP_ prefix
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TraderError::Configuration(e.to_string()))?;

    let mut app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| TraderError::Configuration(e.to_string()))?;

    apply_exchange_env(&mut app_config);
    Ok(app_config)
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let mut app_config = AppConfig::default();
    apply_exchange_env(&mut app_config);
    Ok(app_config)
}

/// Overlay the credential/universe variables the exchange names itself
fn apply_exchange_env(config: &mut AppConfig) {
    if let Ok(key) = std::env::var("MEXC_API_KEY") {
        config.exchange.api_key = Some(key);
    }
    if let Ok(secret) = std::env::var("MEXC_API_SECRET") {
        config.exchange.api_secret = Some(secret);
    }
    if let Ok(base) = std::env::var("MEXC_BASE") {
        config.exchange.base_url = base;
    }
    if let Ok(raw) = std::env::var("TRADE_SYMBOLS") {
        let symbols: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !symbols.is_empty() {
            config.trading.symbols = symbols;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_defaults_when_no_file() {
        let config = load_config(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.exchange.base_url, "https://api.mexc.com");
        assert!(!config.trading.enabled);
    }
}
