//! Trait definition for the exchange client

use async_trait::async_trait;

use super::errors::Result;
use super::types::{AssetBalance, Candle, OrderAck, OrderRequest, OrderStatusReport};
use crate::mexc::messages::ExchangeInfo;

/// Unified interface over the spot exchange REST API
///
/// The trading core depends on this trait only; the concrete client lives in
/// the `mexc` module. Tests substitute a scripted double.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch exchange metadata for all symbols or a subset
    async fn exchange_info(&self, symbols: Option<&[String]>) -> Result<ExchangeInfo>;

    /// Fetch candles ascending by time
    async fn candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>>;

    /// Place (or test-place) a single limit order
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck>;

    /// Query the exchange's authoritative record for one order
    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<OrderStatusReport>;

    /// Fetch free balances for every asset on the account
    async fn account_balances(&self) -> Result<Vec<AssetBalance>>;
}
