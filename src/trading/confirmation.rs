//! Order confirmation strategies
//!
//! Simulation assumes entries fill immediately; live mode polls the
//! exchange's authoritative record. Both sit behind one interface so the
//! decision loop never branches on the mode.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use crate::common::errors::Result;
use crate::common::traits::ExchangeApi;
use crate::common::types::OrderStatus;

/// Outcome of checking one outstanding order
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// Order filled; fill data present when the exchange reported it
    Filled {
        executed_qty: Option<Decimal>,
        cumulative_quote: Option<Decimal>,
    },
    /// Order will never fill (cancelled, rejected, expired)
    Cancelled,
    /// Still working; check again next tick. Partial fills land here.
    Pending,
}

/// How the trader learns whether an order filled
#[async_trait]
pub trait ConfirmationStrategy: Send + Sync {
    /// Confirm an entry (buy) order
    async fn confirm_entry(&self, symbol: &str, order_id: Option<&str>) -> Result<Confirmation>;

    /// Confirm an exit (sell) order
    ///
    /// Defaults to Pending: strategies that cannot observe real fills must
    /// not pretend an exit completed.
    async fn confirm_exit(&self, _symbol: &str, _order_id: Option<&str>) -> Result<Confirmation> {
        Ok(Confirmation::Pending)
    }
}

/// Simulation-mode strategy: entries are assumed filled at the observed
/// price, exits rest indefinitely (the test endpoint never executes)
pub struct AssumeFilled;

#[async_trait]
impl ConfirmationStrategy for AssumeFilled {
    async fn confirm_entry(&self, _symbol: &str, _order_id: Option<&str>) -> Result<Confirmation> {
        Ok(Confirmation::Filled {
            executed_qty: None,
            cumulative_quote: None,
        })
    }
}

/// Live-mode strategy: poll the exchange order record by id
pub struct PollExchange {
    api: Arc<dyn ExchangeApi>,
}

impl PollExchange {
    pub fn new(api: Arc<dyn ExchangeApi>) -> Self {
        Self { api }
    }

    async fn poll(&self, symbol: &str, order_id: Option<&str>) -> Result<Confirmation> {
        let Some(order_id) = order_id else {
            warn!(symbol, "no order id to reconcile; leaving state unchanged");
            return Ok(Confirmation::Pending);
        };

        let report = self.api.order_status(symbol, order_id).await?;
        Ok(match report.status {
            OrderStatus::Filled => Confirmation::Filled {
                executed_qty: report.executed_qty,
                cumulative_quote: report.cumulative_quote_qty,
            },
            status if status.is_terminal_failure() => Confirmation::Cancelled,
            _ => Confirmation::Pending,
        })
    }
}

#[async_trait]
impl ConfirmationStrategy for PollExchange {
    async fn confirm_entry(&self, symbol: &str, order_id: Option<&str>) -> Result<Confirmation> {
        self.poll(symbol, order_id).await
    }

    async fn confirm_exit(&self, symbol: &str, order_id: Option<&str>) -> Result<Confirmation> {
        self.poll(symbol, order_id).await
    }
}

/// Strategy selection by configuration
pub fn strategy_for(api: Arc<dyn ExchangeApi>, live: bool) -> Arc<dyn ConfirmationStrategy> {
    if live {
        Arc::new(PollExchange::new(api))
    } else {
        Arc::new(AssumeFilled)
    }
}
