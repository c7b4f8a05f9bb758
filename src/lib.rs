//! MEXC Spot Trader Library
//!
//! A Rust library that turns technical-analysis recommendations into
//! exchange-compliant MEXC spot limit orders and tracks each symbol
//! through its position lifecycle.

pub mod common;
pub mod config;
pub mod mexc;
pub mod trading;

// Re-export commonly used types
pub use common::errors::{Result, TraderError};
pub use common::traits::ExchangeApi;
pub use common::types::{
    AssetBalance, Candle, OrderAck, OrderRequest, OrderStatus, OrderStatusReport, OrderType, Side,
    TimeInForce,
};
pub use config::types::AppConfig;
pub use mexc::rest::MexcRestClient;

// Trading core types
pub use trading::{
    Advice, AdviceBook, AdviceSource, AssumeFilled, Confirmation, ConfirmationStrategy,
    EventSender, FilterCache, MemoryStore, OrderRecord, PgStore, PollExchange, Position,
    PositionState, PositionStore, Recommendation, SymbolFilters, SymbolRules, TradeEvent, Trader,
    TraderStatus,
};
