//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Exchange connectivity configuration
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Trading behavior configuration
    #[serde(default)]
    pub trading: TradingConfig,
    /// Database configuration (optional; in-memory store when absent)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            trading: TradingConfig::default(),
            database: None,
            settings: AppSettings::default(),
        }
    }
}

/// Exchange connectivity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// API key for signed requests
    #[serde(default)]
    pub api_key: Option<String>,
    /// API secret for signing requests
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Base URL for the spot REST API
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// recvWindow parameter sent with signed requests, in milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
    /// TTL for the cached exchangeInfo snapshot, in seconds
    #[serde(default = "default_metadata_ttl")]
    pub metadata_ttl_seconds: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: default_exchange_base_url(),
            request_timeout_seconds: default_request_timeout(),
            recv_window_ms: default_recv_window(),
            metadata_ttl_seconds: default_metadata_ttl(),
        }
    }
}

fn default_exchange_base_url() -> String {
    "https://api.mexc.com".to_string()
}

fn default_request_timeout() -> u64 {
    20
}

fn default_recv_window() -> u64 {
    5000
}

fn default_metadata_ttl() -> u64 {
    300
}

/// Trading behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Master switch; a disabled trader ticks as a no-op
    #[serde(default)]
    pub enabled: bool,
    /// Place real orders; false routes to the exchange's test endpoint and
    /// assumes immediate fills
    #[serde(default)]
    pub live: bool,
    /// Symbol universe to trade
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Take-profit target as a fraction (0.02 = 2%)
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    /// Stop-loss as a fraction; 0 disables
    #[serde(default)]
    pub stop_loss_pct: Decimal,
    /// Quote-currency budget ceiling per trade
    #[serde(default = "default_per_trade_budget")]
    pub per_trade_budget: Decimal,
    /// Maker fee in basis points
    #[serde(default = "default_maker_fee_bps")]
    pub maker_fee_bps: Decimal,
    /// Taker fee in basis points
    #[serde(default = "default_taker_fee_bps")]
    pub taker_fee_bps: Decimal,
    /// Minimum acceptable price/ATR ratio before entering
    #[serde(default = "default_min_atr_ratio")]
    pub min_atr_ratio: Decimal,
    /// Seconds between trading ticks
    #[serde(default = "default_tick_period")]
    pub tick_period_seconds: u64,
    /// Candle interval used for prices and ATR recomputation
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,
    /// Floor for min-notional when the exchange does not report one
    #[serde(default = "default_min_notional_floor")]
    pub min_notional_floor: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            live: false,
            symbols: default_symbols(),
            take_profit_pct: default_take_profit_pct(),
            stop_loss_pct: Decimal::ZERO,
            per_trade_budget: default_per_trade_budget(),
            maker_fee_bps: default_maker_fee_bps(),
            taker_fee_bps: default_taker_fee_bps(),
            min_atr_ratio: default_min_atr_ratio(),
            tick_period_seconds: default_tick_period(),
            candle_interval: default_candle_interval(),
            min_notional_floor: default_min_notional_floor(),
        }
    }
}

impl TradingConfig {
    /// Maker fee as a fraction (bps / 10000)
    pub fn maker_fee(&self) -> Decimal {
        self.maker_fee_bps / dec!(10000)
    }

    /// Taker fee as a fraction (bps / 10000)
    pub fn taker_fee(&self) -> Decimal {
        self.taker_fee_bps / dec!(10000)
    }
}

fn default_symbols() -> Vec<String> {
    ["BTCUSDT", "ETHUSDT", "SOLUSDT", "SUIUSDT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_take_profit_pct() -> Decimal {
    dec!(0.02)
}

fn default_per_trade_budget() -> Decimal {
    dec!(50)
}

fn default_maker_fee_bps() -> Decimal {
    dec!(8)
}

fn default_taker_fee_bps() -> Decimal {
    dec!(10)
}

fn default_min_atr_ratio() -> Decimal {
    dec!(40)
}

fn default_tick_period() -> u64 {
    15
}

fn default_candle_interval() -> String {
    "60m".to_string()
}

fn default_min_notional_floor() -> Decimal {
    dec!(5)
}

/// Database configuration for the position/order store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// API credentials for signed requests
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }
}

impl ExchangeConfig {
    /// Credentials when both halves are configured
    pub fn credentials(&self) -> Option<ApiCredentials> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(ApiCredentials::new(key.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TradingConfig::default();
        assert!(!cfg.enabled);
        assert!(!cfg.live);
        assert_eq!(cfg.take_profit_pct, dec!(0.02));
        assert_eq!(cfg.stop_loss_pct, Decimal::ZERO);
        assert_eq!(cfg.min_atr_ratio, dec!(40));
        assert_eq!(cfg.tick_period_seconds, 15);
    }

    #[test]
    fn test_fee_fractions() {
        let cfg = TradingConfig::default();
        assert_eq!(cfg.maker_fee(), dec!(0.0008));
        assert_eq!(cfg.taker_fee(), dec!(0.001));
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let mut cfg = ExchangeConfig::default();
        assert!(cfg.credentials().is_none());

        cfg.api_key = Some("key".to_string());
        assert!(cfg.credentials().is_none());

        cfg.api_secret = Some("secret".to_string());
        let creds = cfg.credentials().unwrap();
        assert_eq!(creds.api_key, "key");
    }
}
