//! Channel type definitions for inter-task communication

use tokio::sync::mpsc;

use crate::trading::events::TradeEvent;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new trade event channel with the default buffer size
pub fn create_event_channel() -> (mpsc::Sender<TradeEvent>, mpsc::Receiver<TradeEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new trade event channel with a custom buffer size
pub fn create_event_channel_with_size(
    size: usize,
) -> (mpsc::Sender<TradeEvent>, mpsc::Receiver<TradeEvent>) {
    mpsc::channel(size)
}
