//! REST API client for the MEXC spot exchange

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use super::auth::signed_query;
use super::messages::*;
use crate::common::errors::{Result, TraderError};
use crate::common::traits::ExchangeApi;
use crate::common::types::{
    AssetBalance, Candle, OrderAck, OrderRequest, OrderStatusReport,
};
use crate::config::types::ApiCredentials;

/// Candle intervals the exchange accepts
const VALID_INTERVALS: &[&str] = &["1m", "5m", "15m", "30m", "60m", "4h", "1d", "1W", "1M"];

/// Common aliases mapped onto the exchange's spellings
fn interval_alias(interval: &str) -> &str {
    match interval {
        "1h" => "60m",
        "4hr" => "4h",
        "1w" => "1W",
        "1mo" => "1M",
        other => other,
    }
}

/// Normalize and validate a candle interval
pub fn normalize_interval(interval: &str) -> Result<&str> {
    let normalized = interval_alias(interval.trim());
    if VALID_INTERVALS.contains(&normalized) {
        Ok(normalized)
    } else {
        Err(TraderError::Configuration(format!(
            "invalid interval '{}'; use one of {:?}",
            interval, VALID_INTERVALS
        )))
    }
}

/// REST API client for MEXC spot
#[derive(Debug, Clone)]
pub struct MexcRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for the spot API
    base_url: String,
    /// Optional API credentials for signed endpoints
    credentials: Option<ApiCredentials>,
    /// recvWindow sent with signed requests
    recv_window_ms: u64,
}

impl MexcRestClient {
    /// Create a new REST client (unauthenticated)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(20))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TraderError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
            recv_window_ms: 5000,
        })
    }

    /// Set API credentials for signed requests
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the recvWindow sent with signed requests
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    fn credentials(&self) -> Result<&ApiCredentials> {
        self.credentials
            .as_ref()
            .ok_or(TraderError::MissingCredentials)
    }

    fn sign(&self, params: &[(&str, String)]) -> Result<(String, String)> {
        let creds = self.credentials()?;
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let query = signed_query(&creds.api_secret, params, timestamp_ms, self.recv_window_ms)?;
        Ok((creds.api_key.clone(), query))
    }

    /// Map a non-success response into `Exchange{status, body}`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TraderError::Exchange {
                status: status.as_u16(),
                body,
            })
        }
    }

    // ========================================================================
    // Public Endpoints (No Authentication Required)
    // ========================================================================

    /// Get server time in epoch milliseconds
    #[instrument(skip(self))]
    pub async fn server_time(&self) -> Result<i64> {
        let url = format!("{}/api/v3/time", self.base_url);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        let time: ServerTimeResponse = response.json().await?;
        Ok(time.server_time)
    }

    /// Get exchange metadata for all symbols or a subset
    #[instrument(skip(self))]
    pub async fn get_exchange_info(&self, symbols: Option<&[String]>) -> Result<ExchangeInfo> {
        let mut url = format!("{}/api/v3/exchangeInfo", self.base_url);
        match symbols {
            None => {}
            Some([single]) => url = format!("{}?symbol={}", url, single),
            Some(many) => url = format!("{}?symbols={}", url, many.join(",")),
        }
        debug!("Fetching exchange info from: {}", url);

        let response = Self::check(self.client.get(&url).send().await?).await?;
        let info: ExchangeInfo = response.json().await?;
        Ok(info)
    }

    /// List symbols with a given quote asset that are online and spot-tradable
    #[instrument(skip(self))]
    pub async fn list_spot_symbols(&self, quote_asset: &str) -> Result<Vec<String>> {
        let info = self.get_exchange_info(None).await?;
        let mut out: Vec<String> = info
            .symbols
            .iter()
            .filter(|s| s.quote_asset == quote_asset && s.is_online())
            .map(|s| s.symbol.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    /// Get candles ascending by time
    #[instrument(skip(self))]
    pub async fn get_candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let interval = normalize_interval(interval)?;
        let limit = limit.min(1000);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );
        debug!("Fetching candles from: {}", url);

        let response = Self::check(self.client.get(&url).send().await?).await?;
        let rows: Vec<Vec<serde_json::Value>> = response.json().await?;
        if rows.is_empty() {
            return Err(TraderError::InvalidResponse(format!(
                "empty klines response for {}",
                symbol
            )));
        }

        rows.iter().map(|row| parse_kline_row(row)).collect()
    }

    // ========================================================================
    // Signed Endpoints
    // ========================================================================

    /// Place (or test-place) a single order
    #[instrument(skip(self, request), fields(symbol = %request.symbol, side = %request.side))]
    pub async fn post_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let path = if request.is_test {
            "/api/v3/order/test"
        } else {
            "/api/v3/order"
        };

        let params: Vec<(&str, String)> = vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.to_string()),
            ("type", request.order_type.to_string()),
            ("quantity", request.qty.normalize().to_string()),
            ("price", request.price.normalize().to_string()),
            ("timeInForce", request.time_in_force.to_string()),
            ("newClientOrderId", request.client_order_id.clone()),
        ];
        let (api_key, body) = self.sign(&params)?;

        let url = format!("{}{}", self.base_url, path);
        debug!("Placing order at: {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-MEXC-APIKEY", api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let text = response.text().await?;
        let ack: OrderAckResponse = if text.trim().is_empty() {
            OrderAckResponse::default()
        } else {
            serde_json::from_str(&text)?
        };

        Ok(OrderAck {
            order_id: ack.order_id,
            status: ack.status,
            executed_qty: ack.executed_qty,
            cumulative_quote_qty: ack.cumulative_quote_qty,
        })
    }

    /// Query one order's state from the exchange's record
    #[instrument(skip(self))]
    pub async fn get_order_status(&self, symbol: &str, order_id: &str) -> Result<OrderStatusReport> {
        let params: Vec<(&str, String)> = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let (api_key, query) = self.sign(&params)?;

        let url = format!("{}/api/v3/order?{}", self.base_url, query);
        let response = self
            .client
            .get(&url)
            .header("X-MEXC-APIKEY", api_key)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let report: OrderQueryResponse = response.json().await?;
        Ok(OrderStatusReport {
            status: report.status,
            executed_qty: report.executed_qty,
            cumulative_quote_qty: report.cumulative_quote_qty,
        })
    }

    /// Fetch free balances for every asset on the account
    #[instrument(skip(self))]
    pub async fn get_account_balances(&self) -> Result<Vec<AssetBalance>> {
        let params: Vec<(&str, String)> = vec![];
        let (api_key, query) = self.sign(&params)?;

        let url = format!("{}/api/v3/account?{}", self.base_url, query);
        let response = self
            .client
            .get(&url)
            .header("X-MEXC-APIKEY", api_key)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let account: AccountResponse = response.json().await?;
        Ok(account
            .balances
            .into_iter()
            .map(|b| AssetBalance {
                asset: b.asset,
                free: b.free,
            })
            .collect())
    }
}

#[async_trait]
impl ExchangeApi for MexcRestClient {
    async fn exchange_info(&self, symbols: Option<&[String]>) -> Result<ExchangeInfo> {
        self.get_exchange_info(symbols).await
    }

    async fn candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        self.get_candles(symbol, interval, limit).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        self.post_order(request).await
    }

    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<OrderStatusReport> {
        self.get_order_status(symbol, order_id).await
    }

    async fn account_balances(&self) -> Result<Vec<AssetBalance>> {
        self.get_account_balances().await
    }
}
