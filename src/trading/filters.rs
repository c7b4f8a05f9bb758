//! Exchange filter cache
//!
//! One `exchangeInfo` snapshot is shared across all symbols and refreshed on
//! a fixed TTL to bound request volume. Parsed per-symbol rules are cached
//! for the process lifetime: filters change far less often than prices, so
//! staleness there is an accepted tradeoff. Tradability is the exception and
//! is always read from the TTL'd snapshot.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::common::errors::{Result, TraderError};
use crate::common::traits::ExchangeApi;
use crate::mexc::messages::{ExchangeInfo, SymbolInfo};

/// Default TTL for the shared metadata snapshot
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(300);

/// Fallback precision when the exchange reports none
const FALLBACK_PRECISION: u32 = 8;

/// Per-symbol order constraints, all exact decimals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFilters {
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Minimum quantity increment
    pub step_size: Decimal,
    /// Minimum order quantity
    pub min_qty: Decimal,
    /// Minimum price * quantity
    pub min_notional: Decimal,
}

/// Per-symbol metadata the trading loop needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRules {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub filters: SymbolFilters,
}

struct Snapshot {
    fetched_at: Instant,
    info: ExchangeInfo,
}

/// Process-wide cache of exchange metadata and derived symbol rules
pub struct FilterCache {
    api: Arc<dyn ExchangeApi>,
    ttl: Duration,
    min_notional_floor: Decimal,
    snapshot: RwLock<Option<Snapshot>>,
    rules: RwLock<HashMap<String, SymbolRules>>,
}

impl FilterCache {
    pub fn new(api: Arc<dyn ExchangeApi>, ttl: Duration, min_notional_floor: Decimal) -> Self {
        Self {
            api,
            ttl,
            min_notional_floor,
            snapshot: RwLock::new(None),
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Rules for a symbol, parsed once per process lifetime
    ///
    /// Fails with `UnknownSymbol` when the exchange reports no metadata.
    pub async fn rules(&self, symbol: &str) -> Result<SymbolRules> {
        if let Some(rules) = self.rules.read().await.get(symbol) {
            return Ok(rules.clone());
        }

        let rules = {
            let snapshot = self.snapshot().await?;
            let guard = snapshot.read().await;
            let info = &guard
                .as_ref()
                .expect("snapshot populated before read")
                .info;
            let sym = info
                .symbol(symbol)
                .ok_or_else(|| TraderError::UnknownSymbol(symbol.to_string()))?;
            derive_rules(sym, self.min_notional_floor)
        };

        debug!(symbol, ?rules.filters, "derived symbol rules");
        self.rules
            .write()
            .await
            .insert(symbol.to_string(), rules.clone());
        Ok(rules)
    }

    /// Whether the exchange currently allows spot trading on the symbol
    ///
    /// Always answered from the TTL'd snapshot, never the forever-cache.
    pub async fn is_tradable(&self, symbol: &str) -> Result<bool> {
        let snapshot = self.snapshot().await?;
        let guard = snapshot.read().await;
        let info = &guard
            .as_ref()
            .expect("snapshot populated before read")
            .info;
        let sym = info
            .symbol(symbol)
            .ok_or_else(|| TraderError::UnknownSymbol(symbol.to_string()))?;
        Ok(sym.is_online())
    }

    /// Ensure the shared snapshot exists and is within TTL, returning a
    /// handle to the lock. Overwrite-on-refresh; a stale read racing the
    /// refresh is acceptable.
    async fn snapshot(&self) -> Result<&RwLock<Option<Snapshot>>> {
        let fresh = {
            let guard = self.snapshot.read().await;
            matches!(&*guard, Some(s) if s.fetched_at.elapsed() < self.ttl)
        };

        if !fresh {
            let info = self.api.exchange_info(None).await?;
            debug!(symbols = info.symbols.len(), "refreshed exchange metadata");
            let mut guard = self.snapshot.write().await;
            *guard = Some(Snapshot {
                fetched_at: Instant::now(),
                info,
            });
        }

        Ok(&self.snapshot)
    }
}

/// Parse explicit filters, falling back to precision-derived defaults
fn derive_rules(sym: &SymbolInfo, min_notional_floor: Decimal) -> SymbolRules {
    let mut tick_size: Option<Decimal> = None;
    let mut step_size: Option<Decimal> = None;
    let mut min_qty: Option<Decimal> = None;
    let mut min_notional: Option<Decimal> = None;

    // Exchanges vary filter naming; match by substring
    if let Some(filters) = &sym.filters {
        for entry in filters {
            let kind = entry.filter_type.to_lowercase();
            if kind.contains("price") {
                tick_size = entry.tick_size.filter(|v| *v > Decimal::ZERO).or(tick_size);
            }
            if kind.contains("lot") {
                step_size = entry.step_size.filter(|v| *v > Decimal::ZERO).or(step_size);
                min_qty = entry.min_qty.filter(|v| *v > Decimal::ZERO).or(min_qty);
            }
            if kind.contains("notional") {
                min_notional = entry
                    .min_notional
                    .filter(|v| *v > Decimal::ZERO)
                    .or(min_notional);
            }
        }
    }

    let step_size = step_size
        .or(sym.base_size_precision.filter(|v| *v > Decimal::ZERO))
        .unwrap_or_else(|| {
            power_of_ten(sym.base_asset_precision.unwrap_or(FALLBACK_PRECISION))
        });

    let tick_size = tick_size.unwrap_or_else(|| {
        let precision = sym
            .quote_precision
            .unwrap_or(FALLBACK_PRECISION)
            .max(sym.quote_asset_precision.unwrap_or(FALLBACK_PRECISION));
        power_of_ten(precision)
    });

    SymbolRules {
        symbol: sym.symbol.clone(),
        base_asset: sym.base_asset.clone(),
        quote_asset: sym.quote_asset.clone(),
        filters: SymbolFilters {
            tick_size,
            step_size,
            min_qty: min_qty.unwrap_or(step_size),
            min_notional: min_notional.unwrap_or(min_notional_floor),
        },
    }
}

/// 10^-precision as an exact decimal
fn power_of_ten(precision: u32) -> Decimal {
    Decimal::new(1, precision.min(28))
}
