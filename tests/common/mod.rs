//! Common test utilities and fixtures
//!
//! `ScriptedExchange` is an in-memory `ExchangeApi` double: tests script the
//! metadata, candles, order acks, order statuses and balances it should
//! serve, and inspect the order requests it captured.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use mexc_spot_trader::common::channels::create_event_channel_with_size;
use mexc_spot_trader::common::errors::{Result, TraderError};
use mexc_spot_trader::common::traits::ExchangeApi;
use mexc_spot_trader::common::types::{
    AssetBalance, Candle, OrderAck, OrderRequest, OrderStatus, OrderStatusReport,
};
use mexc_spot_trader::config::types::TradingConfig;
use mexc_spot_trader::mexc::messages::ExchangeInfo;
use mexc_spot_trader::trading::confirmation::strategy_for;
use mexc_spot_trader::trading::events::TradeEvent;
use mexc_spot_trader::trading::filters::FilterCache;
use mexc_spot_trader::trading::recommendations::AdviceBook;
use mexc_spot_trader::trading::store::{MemoryStore, PositionStore};
use mexc_spot_trader::trading::trader::Trader;

/// Metadata for one symbol with the standard test filters
/// (tick 0.01, lot step as given, min notional 5)
pub fn symbol_meta(
    symbol: &str,
    base: &str,
    quote: &str,
    step_size: &str,
    tradable: bool,
) -> serde_json::Value {
    serde_json::json!({
        "symbol": symbol,
        "status": "1",
        "isSpotTradingAllowed": tradable,
        "baseAsset": base,
        "quoteAsset": quote,
        "filters": [
            {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
            {"filterType": "LOT_SIZE", "stepSize": step_size, "minQty": step_size},
            {"filterType": "NOTIONAL", "minNotional": "5"}
        ]
    })
}

pub fn exchange_info(symbols: Vec<serde_json::Value>) -> ExchangeInfo {
    serde_json::from_value(serde_json::json!({ "symbols": symbols })).unwrap()
}

/// A flat candle closing at `close`
pub fn candle(i: i64, close: Decimal) -> Candle {
    Candle {
        open_time: Utc.timestamp_opt(1_700_000_000 + i * 3600, 0).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: dec!(1),
        close_time: Utc.timestamp_opt(1_700_000_000 + i * 3600 + 3599, 0).unwrap(),
    }
}

/// The minimal two-candle series the price fetch needs
pub fn close_series(close: Decimal) -> Vec<Candle> {
    (0..2).map(|i| candle(i, close)).collect()
}

/// Scripted response to one order placement
pub enum ScriptedAck {
    /// Accept with a generated order id and NEW status
    Accept,
    /// Accept with an explicit ack
    AcceptWith(OrderAck),
    /// Reject with an exchange error
    Reject { status: u16, body: String },
}

/// In-memory `ExchangeApi` double
#[derive(Default)]
pub struct ScriptedExchange {
    info: Mutex<Option<ExchangeInfo>>,
    candles: Mutex<HashMap<String, Vec<Candle>>>,
    acks: Mutex<VecDeque<ScriptedAck>>,
    placed: Mutex<Vec<OrderRequest>>,
    statuses: Mutex<HashMap<String, OrderStatusReport>>,
    balances: Mutex<Vec<AssetBalance>>,
    fail_balances: AtomicBool,
    next_order_id: AtomicU64,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_info(&self, info: ExchangeInfo) {
        *self.info.lock().unwrap() = Some(info);
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles
            .lock()
            .unwrap()
            .insert(symbol.to_string(), candles);
    }

    pub fn set_close(&self, symbol: &str, close: Decimal) {
        self.set_candles(symbol, close_series(close));
    }

    pub fn push_ack(&self, ack: ScriptedAck) {
        self.acks.lock().unwrap().push_back(ack);
    }

    pub fn set_order_status(&self, order_id: &str, report: OrderStatusReport) {
        self.statuses
            .lock()
            .unwrap()
            .insert(order_id.to_string(), report);
    }

    pub fn set_balance(&self, asset: &str, free: Decimal) {
        self.balances.lock().unwrap().push(AssetBalance {
            asset: asset.to_string(),
            free,
        });
    }

    pub fn fail_balances(&self) {
        self.fail_balances.store(true, Ordering::SeqCst);
    }

    /// Every order request this double has received, in order
    pub fn placed_requests(&self) -> Vec<OrderRequest> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeApi for ScriptedExchange {
    async fn exchange_info(&self, _symbols: Option<&[String]>) -> Result<ExchangeInfo> {
        Ok(self
            .info
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| exchange_info(vec![])))
    }

    async fn candles(&self, symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Candle>> {
        self.candles
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| TraderError::InvalidResponse(format!("no candles scripted for {}", symbol)))
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        self.placed.lock().unwrap().push(request.clone());
        let scripted = self.acks.lock().unwrap().pop_front();
        match scripted {
            None | Some(ScriptedAck::Accept) => {
                let id = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(OrderAck {
                    order_id: Some(id.to_string()),
                    status: Some(OrderStatus::New),
                    executed_qty: None,
                    cumulative_quote_qty: None,
                })
            }
            Some(ScriptedAck::AcceptWith(ack)) => Ok(ack),
            Some(ScriptedAck::Reject { status, body }) => {
                Err(TraderError::Exchange { status, body })
            }
        }
    }

    async fn order_status(&self, _symbol: &str, order_id: &str) -> Result<OrderStatusReport> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .unwrap_or(OrderStatusReport {
                status: OrderStatus::New,
                executed_qty: None,
                cumulative_quote_qty: None,
            }))
    }

    async fn account_balances(&self) -> Result<Vec<AssetBalance>> {
        if self.fail_balances.load(Ordering::SeqCst) {
            return Err(TraderError::Exchange {
                status: 500,
                body: "scripted balance failure".to_string(),
            });
        }
        Ok(self.balances.lock().unwrap().clone())
    }
}

/// A fully wired trader over in-memory collaborators
pub struct Harness {
    pub exchange: Arc<ScriptedExchange>,
    pub store: Arc<MemoryStore>,
    pub advice: Arc<AdviceBook>,
    pub events: mpsc::Receiver<TradeEvent>,
    pub trader: Trader,
}

pub fn harness(config: TradingConfig, exchange: ScriptedExchange) -> Harness {
    let exchange = Arc::new(exchange);
    let api: Arc<dyn ExchangeApi> = exchange.clone();
    let store = Arc::new(MemoryStore::new());
    let advice = Arc::new(AdviceBook::new());
    let filters = Arc::new(FilterCache::new(
        api.clone(),
        Duration::from_secs(300),
        dec!(5),
    ));
    let confirmation = strategy_for(api.clone(), config.live);
    let (event_tx, event_rx) = create_event_channel_with_size(64);

    let store_dyn: Arc<dyn PositionStore> = store.clone();
    let trader = Trader::new(
        api,
        filters,
        store_dyn,
        advice.clone(),
        confirmation,
        event_tx,
        config,
    );

    Harness {
        exchange,
        store,
        advice,
        events: event_rx,
        trader,
    }
}

/// Everything currently buffered on the event channel
pub fn drain_events(rx: &mut mpsc::Receiver<TradeEvent>) -> Vec<TradeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
