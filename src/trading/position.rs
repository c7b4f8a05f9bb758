//! Position and order-record data model
//!
//! One `Position` row per symbol, owned exclusively by the trading loop.
//! `OrderRecord`s are an append-only audit log: one row per placement
//! attempt, never retried in place.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::types::{OrderAck, OrderRequest, OrderStatus, OrderType, Side};

/// Per-symbol lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    /// No exposure, no outstanding buy
    Flat,
    /// Buy order placed, not yet confirmed filled (live mode only)
    Opening,
    /// Holding base asset
    Long,
    /// Take-profit sell placed, awaiting fill
    Closing,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Flat => write!(f, "flat"),
            PositionState::Opening => write!(f, "opening"),
            PositionState::Long => write!(f, "long"),
            PositionState::Closing => write!(f, "closing"),
        }
    }
}

impl FromStr for PositionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(PositionState::Flat),
            "opening" => Ok(PositionState::Opening),
            "long" => Ok(PositionState::Long),
            "closing" => Ok(PositionState::Closing),
            other => Err(format!("unknown position state: {}", other)),
        }
    }
}

/// What the system believes it holds for one symbol
///
/// Invariant: `qty > 0` implies `state` is Long or Closing; Flat implies
/// `qty == 0` and no outstanding order references. `avg_price` is set only
/// when `qty > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: Decimal,
    pub avg_price: Option<Decimal>,
    pub state: PositionState,
    pub target_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub last_buy_order_id: Option<String>,
    pub last_sell_order_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// A fresh flat row for a symbol entering the trading universe
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            qty: Decimal::ZERO,
            avg_price: None,
            state: PositionState::Flat,
            target_price: None,
            stop_price: None,
            last_buy_order_id: None,
            last_sell_order_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.state == PositionState::Flat
    }

    /// Holding inventory that an exit could sell
    pub fn holds_inventory(&self) -> bool {
        self.qty > Decimal::ZERO && self.avg_price.is_some()
    }

    /// Record a buy placement awaiting confirmation
    pub fn mark_opening(&mut self, buy_order_id: Option<String>) {
        self.state = PositionState::Opening;
        self.last_buy_order_id = buy_order_id;
        self.touch();
    }

    /// Record a confirmed entry
    pub fn open_long(
        &mut self,
        qty: Decimal,
        avg_price: Decimal,
        target_price: Decimal,
        stop_price: Option<Decimal>,
    ) {
        self.qty = qty;
        self.avg_price = Some(avg_price);
        self.state = PositionState::Long;
        self.target_price = Some(target_price);
        self.stop_price = stop_price;
        self.touch();
    }

    /// Record a take-profit sell placement awaiting fill
    pub fn mark_closing(&mut self, sell_order_id: Option<String>) {
        self.state = PositionState::Closing;
        self.last_sell_order_id = sell_order_id;
        self.touch();
    }

    /// Return a Closing row to Long after its sell was cancelled
    ///
    /// Inventory is still held, so the next tick re-places the take-profit.
    pub fn abandon_close(&mut self) {
        self.state = PositionState::Long;
        self.last_sell_order_id = None;
        self.touch();
    }

    /// Reset to flat with no exposure and no outstanding order references
    pub fn reset_flat(&mut self) {
        self.qty = Decimal::ZERO;
        self.avg_price = None;
        self.state = PositionState::Flat;
        self.target_price = None;
        self.stop_price = None;
        self.last_buy_order_id = None;
        self.last_sell_order_id = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One placement attempt, exchange-acknowledged or locally asserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Decimal,
    pub qty: Decimal,
    pub status: OrderStatus,
    /// Placed against the exchange's validating (non-executing) endpoint
    pub is_test: bool,
    pub client_order_id: String,
    pub exchange_order_id: Option<String>,
    /// Present only when status is Rejected
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Record for an accepted placement
    pub fn placed(request: &OrderRequest, ack: &OrderAck) -> Self {
        Self {
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            price: request.price,
            qty: request.qty,
            status: ack.status.unwrap_or(OrderStatus::New),
            is_test: request.is_test,
            client_order_id: request.client_order_id.clone(),
            exchange_order_id: ack.order_id.clone(),
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Record for a rejected placement
    pub fn rejected(request: &OrderRequest, error: impl Into<String>) -> Self {
        Self {
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            price: request.price,
            qty: request.qty,
            status: OrderStatus::Rejected,
            is_test: request.is_test,
            client_order_id: request.client_order_id.clone(),
            exchange_order_id: None,
            error: Some(error.into()),
            created_at: Utc::now(),
        }
    }
}
