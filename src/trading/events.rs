//! Broadcast events emitted by the trading loop
//!
//! Besides persisted rows, these events are the loop's only externally
//! observable trace. The surrounding application forwards them to whatever
//! transport it runs (websocket, log shipper); here they are just a channel.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::common::types::Side;

/// One discrete trading occurrence, tagged for the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeEvent {
    /// A symbol was passed over this tick, with the reason
    TradeSkip { symbol: String, reason: String },
    /// A limit buy was placed (or test-placed)
    TradeBuyPlaced {
        symbol: String,
        qty: Decimal,
        price: Decimal,
        order_id: Option<String>,
    },
    /// An outstanding buy was confirmed filled
    TradeFilledBuy {
        symbol: String,
        qty: Decimal,
        avg_price: Decimal,
    },
    /// An outstanding buy was cancelled or rejected by the exchange
    TradeBuyCancelled { symbol: String, order_id: Option<String> },
    /// A take-profit limit sell was placed
    TradeSellTpPlaced {
        symbol: String,
        qty: Decimal,
        price: Decimal,
        order_id: Option<String>,
    },
    /// A failure scoped to one symbol or one tick
    TradeError { symbol: String, error: String },
}

impl TradeEvent {
    pub fn symbol(&self) -> &str {
        match self {
            TradeEvent::TradeSkip { symbol, .. }
            | TradeEvent::TradeBuyPlaced { symbol, .. }
            | TradeEvent::TradeFilledBuy { symbol, .. }
            | TradeEvent::TradeBuyCancelled { symbol, .. }
            | TradeEvent::TradeSellTpPlaced { symbol, .. }
            | TradeEvent::TradeError { symbol, .. } => symbol,
        }
    }

    /// The side of the order the event describes, when it describes one
    pub fn side(&self) -> Option<Side> {
        match self {
            TradeEvent::TradeBuyPlaced { .. }
            | TradeEvent::TradeFilledBuy { .. }
            | TradeEvent::TradeBuyCancelled { .. } => Some(Side::Buy),
            TradeEvent::TradeSellTpPlaced { .. } => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Sending half of the event channel the loop broadcasts into
pub type EventSender = mpsc::Sender<TradeEvent>;

/// Best-effort send: a full or closed channel loses the event, not the tick
pub fn emit(sender: &EventSender, event: TradeEvent) {
    if let Err(e) = sender.try_send(event) {
        warn!("dropping trade event: {}", e);
    }
}
