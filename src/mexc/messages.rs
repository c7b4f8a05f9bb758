//! MEXC-specific wire types
//!
//! The exchange is inconsistent about numbers: some fields arrive as JSON
//! strings, some as numbers, and kline rows are positional arrays. The
//! deserializers here accept either form and convert to exact decimals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::errors::{Result, TraderError};
use crate::common::types::{Candle, OrderStatus};

/// Top-level response from `/api/v3/exchangeInfo`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInfo {
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

impl ExchangeInfo {
    /// Metadata for one symbol, if the exchange reports it
    pub fn symbol(&self, symbol: &str) -> Option<&SymbolInfo> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }
}

/// Per-symbol metadata from `/api/v3/exchangeInfo`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    /// Trading status; MEXC has used both "1" and "ENABLED" for online
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub status: Option<String>,
    #[serde(default, rename = "isSpotTradingAllowed")]
    pub is_spot_trading_allowed: bool,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
    #[serde(default, rename = "baseAssetPrecision")]
    pub base_asset_precision: Option<u32>,
    #[serde(default, rename = "quotePrecision")]
    pub quote_precision: Option<u32>,
    #[serde(default, rename = "quoteAssetPrecision")]
    pub quote_asset_precision: Option<u32>,
    /// Base-size precision reported as a decimal string, e.g. "0.0001"
    #[serde(
        default,
        rename = "baseSizePrecision",
        deserialize_with = "de::opt_decimal_from_any"
    )]
    pub base_size_precision: Option<Decimal>,
    #[serde(default)]
    pub filters: Option<Vec<FilterEntry>>,
}

impl SymbolInfo {
    /// Online AND spot trading allowed
    pub fn is_online(&self) -> bool {
        let status_ok = match self.status.as_deref() {
            Some("1") | Some("ENABLED") => true,
            Some(_) => false,
            None => true,
        };
        status_ok && self.is_spot_trading_allowed
    }
}

/// One entry in a symbol's filter list
///
/// Only the fields the sizing logic cares about are modeled; everything
/// else the exchange attaches is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterEntry {
    #[serde(rename = "filterType")]
    pub filter_type: String,
    #[serde(default, rename = "tickSize", deserialize_with = "de::opt_decimal_from_any")]
    pub tick_size: Option<Decimal>,
    #[serde(default, rename = "stepSize", deserialize_with = "de::opt_decimal_from_any")]
    pub step_size: Option<Decimal>,
    #[serde(default, rename = "minQty", deserialize_with = "de::opt_decimal_from_any")]
    pub min_qty: Option<Decimal>,
    #[serde(default, rename = "minNotional", deserialize_with = "de::opt_decimal_from_any")]
    pub min_notional: Option<Decimal>,
}

/// Response from order placement; the test endpoint returns `{}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderAckResponse {
    #[serde(default, rename = "orderId", deserialize_with = "de::opt_string_from_any")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default, rename = "executedQty", deserialize_with = "de::opt_decimal_from_any")]
    pub executed_qty: Option<Decimal>,
    #[serde(
        default,
        rename = "cummulativeQuoteQty",
        deserialize_with = "de::opt_decimal_from_any"
    )]
    pub cumulative_quote_qty: Option<Decimal>,
}

/// Response from the single-order query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderQueryResponse {
    pub status: OrderStatus,
    #[serde(default, rename = "executedQty", deserialize_with = "de::opt_decimal_from_any")]
    pub executed_qty: Option<Decimal>,
    #[serde(
        default,
        rename = "cummulativeQuoteQty",
        deserialize_with = "de::opt_decimal_from_any"
    )]
    pub cumulative_quote_qty: Option<Decimal>,
}

/// Response from `/api/v3/account`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
}

/// One asset balance inside the account response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    #[serde(deserialize_with = "de::decimal_from_any")]
    pub free: Decimal,
}

/// Server time response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// Parse one positional kline row:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume]`
pub fn parse_kline_row(row: &[Value]) -> Result<Candle> {
    if row.len() < 7 {
        return Err(TraderError::InvalidResponse(format!(
            "kline row has {} cells, expected at least 7",
            row.len()
        )));
    }

    let open_time = millis_from_value(&row[0])?;
    let close_time = millis_from_value(&row[6])?;

    Ok(Candle {
        open_time,
        open: decimal_from_value(&row[1])?,
        high: decimal_from_value(&row[2])?,
        low: decimal_from_value(&row[3])?,
        close: decimal_from_value(&row[4])?,
        volume: decimal_from_value(&row[5])?,
        close_time,
    })
}

fn millis_from_value(value: &Value) -> Result<DateTime<Utc>> {
    let millis = value
        .as_i64()
        .ok_or_else(|| TraderError::InvalidResponse(format!("Invalid timestamp: {}", value)))?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| TraderError::InvalidResponse(format!("Timestamp out of range: {}", millis)))
}

/// Convert a JSON string or number cell into a Decimal
pub fn decimal_from_value(value: &Value) -> Result<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(TraderError::InvalidResponse(format!(
                "Expected numeric value, got {}",
                other
            )))
        }
    };
    parse_decimal(&text)
        .ok_or_else(|| TraderError::InvalidResponse(format!("Invalid decimal: {}", text)))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

/// String-or-number-tolerant deserializers
pub(crate) mod de {
    use super::{parse_decimal, Value};
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};

    pub fn opt_string_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(_) => None,
        })
    }

    pub fn opt_decimal_from_any<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => parse_decimal(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {}", s))),
            Some(Value::Number(n)) => parse_decimal(&n.to_string())
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {}", n))),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected decimal, got {}",
                other
            ))),
        }
    }

    pub fn decimal_from_any<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        opt_decimal_from_any(deserializer)?
            .ok_or_else(|| serde::de::Error::custom("missing decimal value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_symbol_info_with_filters() {
        let raw = serde_json::json!({
            "symbol": "BTCUSDT",
            "status": "1",
            "isSpotTradingAllowed": true,
            "baseAsset": "BTC",
            "quoteAsset": "USDT",
            "baseAssetPrecision": 8,
            "quotePrecision": 8,
            "quoteAssetPrecision": 8,
            "baseSizePrecision": "0.000001",
            "filters": [
                {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                {"filterType": "LOT_SIZE", "stepSize": "0.000001", "minQty": "0.000001"},
                {"filterType": "MIN_NOTIONAL", "minNotional": "1"}
            ]
        });

        let info: SymbolInfo = serde_json::from_value(raw).unwrap();
        assert!(info.is_online());
        assert_eq!(info.base_asset, "BTC");
        assert_eq!(info.base_size_precision, Some(dec!(0.000001)));

        let filters = info.filters.unwrap();
        assert_eq!(filters[0].tick_size, Some(dec!(0.01)));
        assert_eq!(filters[1].step_size, Some(dec!(0.000001)));
        assert_eq!(filters[2].min_notional, Some(dec!(1)));
    }

    #[test]
    fn test_symbol_info_offline_status() {
        let raw = serde_json::json!({
            "symbol": "DEADUSDT",
            "status": "3",
            "isSpotTradingAllowed": true,
            "baseAsset": "DEAD",
            "quoteAsset": "USDT"
        });
        let info: SymbolInfo = serde_json::from_value(raw).unwrap();
        assert!(!info.is_online());
    }

    #[test]
    fn test_parse_kline_row_mixed_cells() {
        let row = vec![
            serde_json::json!(1_700_000_000_000_i64),
            serde_json::json!("46129.36"),
            serde_json::json!("46205.79"),
            serde_json::json!("46020.00"),
            serde_json::json!(46100.5),
            serde_json::json!("12.5"),
            serde_json::json!(1_700_003_599_999_i64),
            serde_json::json!("576000.1"),
        ];

        let candle = parse_kline_row(&row).unwrap();
        assert_eq!(candle.open, dec!(46129.36));
        assert_eq!(candle.close, dec!(46100.5));
        assert!(candle.close_time > candle.open_time);
    }

    #[test]
    fn test_parse_kline_row_too_short() {
        let row = vec![serde_json::json!(1_i64)];
        assert!(parse_kline_row(&row).is_err());
    }

    #[test]
    fn test_order_ack_empty_body() {
        let ack: OrderAckResponse = serde_json::from_str("{}").unwrap();
        assert!(ack.order_id.is_none());
        assert!(ack.status.is_none());
    }

    #[test]
    fn test_order_ack_numeric_order_id() {
        let ack: OrderAckResponse =
            serde_json::from_str(r#"{"orderId": 123456, "status": "NEW"}"#).unwrap();
        assert_eq!(ack.order_id.as_deref(), Some("123456"));
        assert_eq!(ack.status, Some(OrderStatus::New));
    }

    #[test]
    fn test_balance_entry_string_decimal() {
        let entry: BalanceEntry =
            serde_json::from_str(r#"{"asset": "USDT", "free": "123.45"}"#).unwrap();
        assert_eq!(entry.free, dec!(123.45));
    }
}
