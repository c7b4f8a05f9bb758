//! Trading core: filter cache, sizing, position lifecycle, decision loop

pub mod confirmation;
pub mod events;
pub mod filters;
pub mod position;
pub mod recommendations;
pub mod sizing;
pub mod store;
pub mod trader;
pub mod volatility;

pub use confirmation::{strategy_for, AssumeFilled, Confirmation, ConfirmationStrategy, PollExchange};
pub use events::{emit, EventSender, TradeEvent};
pub use filters::{FilterCache, SymbolFilters, SymbolRules, DEFAULT_METADATA_TTL};
pub use position::{OrderRecord, Position, PositionState};
pub use recommendations::{Advice, AdviceBook, AdviceSource, Recommendation};
pub use store::{MemoryStore, PgStore, PositionStore};
pub use trader::{stop_price, take_profit_price, Trader, TraderStatus};
pub use volatility::{atr, atr_ratio, ATR_LOOKBACK, ATR_PERIOD};
