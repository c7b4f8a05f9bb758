//! Trading decision loop and reconciliation
//!
//! One pass per tick over the symbol universe: reconcile outstanding orders
//! against the exchange's record, evaluate entries from flat, place the
//! take-profit sell for anything held. Per-symbol failures are reported and
//! skipped; the loop itself never crashes on them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::confirmation::{Confirmation, ConfirmationStrategy};
use super::events::{emit, EventSender, TradeEvent};
use super::filters::{FilterCache, SymbolRules};
use super::position::{OrderRecord, Position, PositionState};
use super::recommendations::{Advice, AdviceSource};
use super::store::{latest_buy_qty, PositionStore};
use super::volatility::{atr_ratio, ATR_LOOKBACK, ATR_PERIOD};
use crate::common::errors::{Result, TraderError};
use crate::common::traits::ExchangeApi;
use crate::common::types::{OrderAck, OrderRequest, OrderType, Side, TimeInForce};
use crate::config::types::TradingConfig;

/// Exit price that still nets the target after a maker-side entry fee and a
/// taker-side exit fee. A naive `avg * (1 + target)` under-shoots whenever
/// fees are nonzero.
pub fn take_profit_price(
    avg_price: Decimal,
    maker_fee: Decimal,
    taker_fee: Decimal,
    target_pct: Decimal,
) -> Decimal {
    avg_price * (Decimal::ONE + maker_fee) * (Decimal::ONE + target_pct)
        / (Decimal::ONE - taker_fee)
}

/// Stop level below the entry; zero percent disables it
pub fn stop_price(avg_price: Decimal, stop_loss_pct: Decimal) -> Option<Decimal> {
    if stop_loss_pct > Decimal::ZERO {
        Some(avg_price * (Decimal::ONE - stop_loss_pct))
    } else {
        None
    }
}

/// Configuration and last-run metadata exposed to status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TraderStatus {
    pub enabled: bool,
    pub live: bool,
    pub candle_interval: String,
    pub tick_period_seconds: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_action_count: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct LastRun {
    at: Option<DateTime<Utc>>,
    actions: usize,
    error: Option<String>,
}

/// The decision loop over one symbol universe
///
/// All collaborators are injected so the state machine is testable without
/// network access. Symbols are processed one at a time within a tick; no two
/// writers ever touch the same position row concurrently.
pub struct Trader {
    api: Arc<dyn ExchangeApi>,
    filters: Arc<FilterCache>,
    store: Arc<dyn PositionStore>,
    advice: Arc<dyn AdviceSource>,
    confirmation: Arc<dyn ConfirmationStrategy>,
    events: EventSender,
    config: TradingConfig,
    last_run: RwLock<LastRun>,
}

impl Trader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn ExchangeApi>,
        filters: Arc<FilterCache>,
        store: Arc<dyn PositionStore>,
        advice: Arc<dyn AdviceSource>,
        confirmation: Arc<dyn ConfirmationStrategy>,
        events: EventSender,
        config: TradingConfig,
    ) -> Self {
        Self {
            api,
            filters,
            store,
            advice,
            confirmation,
            events,
            config,
            last_run: RwLock::new(LastRun::default()),
        }
    }

    /// One pass over the universe; returns the count of actions taken
    /// (placements, confirmed fills, cancellations, closing resets)
    pub async fn run_tick(&self, symbols: &[String], interval: &str) -> Result<usize> {
        let outcome = self.tick(symbols, interval).await;

        let mut last = self.last_run.write().await;
        last.at = Some(Utc::now());
        match &outcome {
            Ok(actions) => {
                last.actions = *actions;
                last.error = None;
            }
            Err(e) => last.error = Some(e.to_string()),
        }
        outcome
    }

    /// Fixed-period loop; tick errors are broadcast, never fatal
    pub async fn run_loop(&self, symbols: &[String]) {
        let period = Duration::from_secs(self.config.tick_period_seconds.max(1));
        let interval = self.config.candle_interval.clone();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            period_seconds = self.config.tick_period_seconds,
            symbols = symbols.len(),
            live = self.config.live,
            "trading loop started"
        );

        loop {
            ticker.tick().await;
            match self.run_tick(symbols, &interval).await {
                Ok(actions) if actions > 0 => info!(actions, "trading tick complete"),
                Ok(_) => debug!("trading tick complete, no actions"),
                Err(e) => {
                    error!(error = %e, "trading tick failed");
                    emit(
                        &self.events,
                        TradeEvent::TradeError {
                            symbol: "*".to_string(),
                            error: e.to_string(),
                        },
                    );
                }
            }
        }
    }

    pub async fn status(&self) -> TraderStatus {
        let last = self.last_run.read().await;
        TraderStatus {
            enabled: self.config.enabled,
            live: self.config.live,
            candle_interval: self.config.candle_interval.clone(),
            tick_period_seconds: self.config.tick_period_seconds,
            last_run_at: last.at,
            last_action_count: last.actions,
            last_error: last.error.clone(),
        }
    }

    async fn tick(&self, symbols: &[String], interval: &str) -> Result<usize> {
        if !self.config.enabled {
            return Ok(0);
        }

        let closes = self.fetch_closes(symbols, interval).await;

        // Balances are required context for every live decision; failing to
        // fetch them aborts the whole tick.
        let balances = if self.config.live {
            Some(self.fetch_balances().await?)
        } else {
            None
        };

        let mut actions = 0;
        for symbol in symbols {
            let Some(price) = closes.get(symbol).copied() else {
                self.skip(symbol, "no close price this tick");
                continue;
            };

            match self
                .process_symbol(symbol, price, interval, balances.as_ref())
                .await
            {
                Ok(taken) => actions += taken,
                Err(e) if e.is_symbol_scoped() => {
                    warn!(symbol = %symbol, error = %e, "symbol failed this tick");
                    emit(
                        &self.events,
                        TradeEvent::TradeError {
                            symbol: symbol.clone(),
                            error: e.to_string(),
                        },
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(actions)
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        price: Decimal,
        interval: &str,
        balances: Option<&HashMap<String, Decimal>>,
    ) -> Result<usize> {
        let rules = self.filters.rules(symbol).await?;
        if !self.filters.is_tradable(symbol).await? {
            self.skip(symbol, "spot trading disabled on exchange");
            return Ok(0);
        }

        let mut position = self.store.ensure_position(symbol).await?;
        let mut actions = 0;

        actions += self.reconcile(&mut position, &rules, price).await?;

        if position.state == PositionState::Flat {
            actions += self
                .try_enter(&mut position, &rules, price, interval, balances)
                .await?;
        }

        if position.state == PositionState::Long {
            actions += self.try_exit(&mut position, &rules, balances).await?;
        }

        Ok(actions)
    }

    /// Confirm or reverse the optimistic transitions of earlier ticks
    async fn reconcile(
        &self,
        position: &mut Position,
        rules: &SymbolRules,
        price: Decimal,
    ) -> Result<usize> {
        match position.state {
            PositionState::Opening => {
                let confirmation = self
                    .confirmation
                    .confirm_entry(&position.symbol, position.last_buy_order_id.as_deref())
                    .await?;
                match confirmation {
                    Confirmation::Filled {
                        executed_qty,
                        cumulative_quote,
                    } => {
                        self.apply_entry_fill(position, rules, price, executed_qty, cumulative_quote)
                            .await?;
                        Ok(1)
                    }
                    Confirmation::Cancelled => {
                        let order_id = position.last_buy_order_id.clone();
                        position.reset_flat();
                        self.store.save_position(position).await?;
                        emit(
                            &self.events,
                            TradeEvent::TradeBuyCancelled {
                                symbol: position.symbol.clone(),
                                order_id,
                            },
                        );
                        Ok(1)
                    }
                    Confirmation::Pending => Ok(0),
                }
            }
            PositionState::Closing => {
                let confirmation = self
                    .confirmation
                    .confirm_exit(&position.symbol, position.last_sell_order_id.as_deref())
                    .await?;
                match confirmation {
                    Confirmation::Filled { .. } => {
                        info!(symbol = %position.symbol, "take-profit sell filled");
                        position.reset_flat();
                        self.store.save_position(position).await?;
                        Ok(1)
                    }
                    Confirmation::Cancelled => {
                        // inventory is still held; go back to Long so the
                        // next tick re-places the take-profit
                        warn!(symbol = %position.symbol, "take-profit sell cancelled");
                        position.abandon_close();
                        self.store.save_position(position).await?;
                        Ok(0)
                    }
                    Confirmation::Pending => Ok(0),
                }
            }
            PositionState::Flat | PositionState::Long => Ok(0),
        }
    }

    /// Move an Opening position to Long using exchange fill data when
    /// present, else the locally observed price and recorded quantity
    async fn apply_entry_fill(
        &self,
        position: &mut Position,
        rules: &SymbolRules,
        observed_price: Decimal,
        executed_qty: Option<Decimal>,
        cumulative_quote: Option<Decimal>,
    ) -> Result<()> {
        let filters = &rules.filters;

        let placed_qty = latest_buy_qty(
            self.store.as_ref(),
            &position.symbol,
            position.last_buy_order_id.as_deref(),
        )
        .await?;
        let qty = filters.floor_qty(executed_qty.or(placed_qty).unwrap_or(Decimal::ZERO));
        if qty <= Decimal::ZERO {
            warn!(symbol = %position.symbol, "fill reported with no usable quantity");
            position.reset_flat();
            self.store.save_position(position).await?;
            return Ok(());
        }

        let avg = match (executed_qty, cumulative_quote) {
            (Some(executed), Some(total)) if executed > Decimal::ZERO => total / executed,
            _ => observed_price,
        };
        let avg = filters.round_price(avg);

        let target = filters.round_price(take_profit_price(
            avg,
            self.config.maker_fee(),
            self.config.taker_fee(),
            self.config.take_profit_pct,
        ));
        let stop = stop_price(avg, self.config.stop_loss_pct);

        position.open_long(qty, avg, target, stop);
        self.store.save_position(position).await?;
        emit(
            &self.events,
            TradeEvent::TradeFilledBuy {
                symbol: position.symbol.clone(),
                qty,
                avg_price: avg,
            },
        );
        Ok(())
    }

    /// Entry from Flat: recommendation, volatility gate, sizing, placement
    async fn try_enter(
        &self,
        position: &mut Position,
        rules: &SymbolRules,
        price: Decimal,
        interval: &str,
        balances: Option<&HashMap<String, Decimal>>,
    ) -> Result<usize> {
        let symbol = position.symbol.clone();
        let advice = self
            .advice
            .latest(&symbol)
            .unwrap_or_else(Advice::hold);
        if !advice.recommendation.wants_entry() {
            return Ok(0);
        }

        let ratio = match advice.atr_ratio {
            Some(ratio) => Some(ratio),
            None => self.recompute_atr_ratio(&symbol, interval).await,
        };
        let Some(ratio) = ratio else {
            self.skip(&symbol, "volatility ratio unavailable");
            return Ok(0);
        };
        if ratio < self.config.min_atr_ratio {
            self.skip(
                &symbol,
                format!(
                    "volatility gate: ratio {} below minimum {}",
                    ratio, self.config.min_atr_ratio
                ),
            );
            return Ok(0);
        }

        let mut budget = self.config.per_trade_budget;
        if let Some(balances) = balances {
            let free = balances
                .get(&rules.quote_asset)
                .copied()
                .unwrap_or(Decimal::ZERO);
            budget = budget.min(free);
        }

        let limit_price = rules.filters.round_price(price);
        let qty = rules.filters.size_order(limit_price, budget);
        if qty <= Decimal::ZERO {
            self.skip(
                &symbol,
                format!(
                    "budget {} cannot meet min notional at price {}",
                    budget, limit_price
                ),
            );
            return Ok(0);
        }

        let request = OrderRequest {
            symbol: symbol.clone(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            qty,
            price: limit_price,
            time_in_force: TimeInForce::GoodTilCancelled,
            is_test: !self.config.live,
            client_order_id: format!("buy-{}-{}", symbol, now_millis()),
        };

        let Some(ack) = self.place(&request).await? else {
            return Ok(0);
        };

        position.mark_opening(ack.order_id.clone());
        self.store.save_position(position).await?;
        emit(
            &self.events,
            TradeEvent::TradeBuyPlaced {
                symbol: symbol.clone(),
                qty,
                price: limit_price,
                order_id: ack.order_id.clone(),
            },
        );
        let mut actions = 1;

        // Simulation confirms instantly; a live order confirms here only if
        // the exchange already reports it filled, otherwise it stays Opening
        // for later reconciliation.
        let confirmation = self
            .confirmation
            .confirm_entry(&symbol, position.last_buy_order_id.as_deref())
            .await?;
        match confirmation {
            Confirmation::Filled {
                executed_qty,
                cumulative_quote,
            } => {
                self.apply_entry_fill(
                    position,
                    rules,
                    limit_price,
                    executed_qty.or(ack.executed_qty),
                    cumulative_quote.or(ack.cumulative_quote_qty),
                )
                .await?;
                actions += 1;
            }
            Confirmation::Cancelled => {
                let order_id = position.last_buy_order_id.clone();
                position.reset_flat();
                self.store.save_position(position).await?;
                emit(
                    &self.events,
                    TradeEvent::TradeBuyCancelled {
                        symbol: symbol.clone(),
                        order_id,
                    },
                );
                actions += 1;
            }
            Confirmation::Pending => {}
        }

        Ok(actions)
    }

    /// Exit from Long: place the take-profit limit sell
    async fn try_exit(
        &self,
        position: &mut Position,
        rules: &SymbolRules,
        balances: Option<&HashMap<String, Decimal>>,
    ) -> Result<usize> {
        if !position.holds_inventory() {
            return Ok(0);
        }
        let symbol = position.symbol.clone();
        let Some(avg) = position.avg_price else {
            return Ok(0);
        };

        // Trim the sell down to what the account actually holds, never up.
        let mut sell_qty = position.qty;
        if let Some(balances) = balances {
            let free = balances
                .get(&rules.base_asset)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if free < sell_qty {
                sell_qty = free;
            }
        }
        let sell_qty = rules.filters.floor_qty(sell_qty);
        if sell_qty <= Decimal::ZERO {
            self.skip(&symbol, "no sellable base balance");
            return Ok(0);
        }

        let target = position.target_price.unwrap_or_else(|| {
            take_profit_price(
                avg,
                self.config.maker_fee(),
                self.config.taker_fee(),
                self.config.take_profit_pct,
            )
        });
        let target = rules.filters.round_price(target);

        let request = OrderRequest {
            symbol: symbol.clone(),
            side: Side::Sell,
            order_type: OrderType::Limit,
            qty: sell_qty,
            price: target,
            time_in_force: TimeInForce::GoodTilCancelled,
            is_test: !self.config.live,
            client_order_id: format!("sell-{}-{}", symbol, now_millis()),
        };

        let Some(ack) = self.place(&request).await? else {
            return Ok(0);
        };

        position.mark_closing(ack.order_id.clone());
        self.store.save_position(position).await?;
        emit(
            &self.events,
            TradeEvent::TradeSellTpPlaced {
                symbol,
                qty: sell_qty,
                price: target,
                order_id: ack.order_id,
            },
        );
        Ok(1)
    }

    /// Place one order, recording the attempt either way
    ///
    /// An exchange rejection becomes a REJECTED audit row plus an error
    /// event and returns None; the loop retries on a later tick, never in
    /// place. Record-write failures propagate.
    async fn place(&self, request: &OrderRequest) -> Result<Option<OrderAck>> {
        match self.api.place_order(request).await {
            Ok(ack) => {
                self.store
                    .record_order(&OrderRecord::placed(request, &ack))
                    .await?;
                Ok(Some(ack))
            }
            Err(e @ TraderError::Exchange { .. }) => {
                let text = e.to_string();
                self.store
                    .record_order(&OrderRecord::rejected(request, text.clone()))
                    .await?;
                emit(
                    &self.events,
                    TradeEvent::TradeError {
                        symbol: request.symbol.clone(),
                        error: text,
                    },
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort last close per symbol; a failed fetch skips the symbol
    /// for this tick only
    async fn fetch_closes(&self, symbols: &[String], interval: &str) -> HashMap<String, Decimal> {
        let mut closes = HashMap::new();
        for symbol in symbols {
            match self.api.candles(symbol, interval, 2).await {
                Ok(candles) => {
                    if let Some(last) = candles.last() {
                        closes.insert(symbol.clone(), last.close);
                    }
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "price fetch failed"),
            }
        }
        closes
    }

    async fn fetch_balances(&self) -> Result<HashMap<String, Decimal>> {
        let balances = self.api.account_balances().await?;
        Ok(balances.into_iter().map(|b| (b.asset, b.free)).collect())
    }

    /// One-off recomputation when the advice snapshot carries no ratio
    async fn recompute_atr_ratio(&self, symbol: &str, interval: &str) -> Option<Decimal> {
        match self.api.candles(symbol, interval, ATR_LOOKBACK).await {
            Ok(candles) => atr_ratio(&candles, ATR_PERIOD),
            Err(e) => {
                warn!(symbol, error = %e, "ATR recomputation failed");
                None
            }
        }
    }

    fn skip(&self, symbol: &str, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(symbol, %reason, "skipping symbol");
        emit(
            &self.events,
            TradeEvent::TradeSkip {
                symbol: symbol.to_string(),
                reason,
            },
        );
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
