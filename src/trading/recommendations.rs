//! Recommendation collaborator interface
//!
//! The technical-analysis engine lives outside this subsystem; the trading
//! loop consumes its latest output per symbol as an opaque snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Closed set of recommendations the decision loop understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "ACCUMULATE")]
    Accumulate,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "AVOID/SELL", alias = "AVOID", alias = "SELL")]
    AvoidSell,
}

impl Recommendation {
    /// Parse the wire spelling; anything unrecognized reads as Hold so the
    /// loop never trades on advice it does not understand
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "BUY" => Recommendation::Buy,
            "ACCUMULATE" => Recommendation::Accumulate,
            "AVOID/SELL" | "AVOID" | "SELL" => Recommendation::AvoidSell,
            _ => Recommendation::Hold,
        }
    }

    /// Only Buy and Accumulate can open a position
    pub fn wants_entry(&self) -> bool {
        matches!(self, Recommendation::Buy | Recommendation::Accumulate)
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Accumulate => write!(f, "ACCUMULATE"),
            Recommendation::Hold => write!(f, "HOLD"),
            Recommendation::AvoidSell => write!(f, "AVOID/SELL"),
        }
    }
}

/// Latest advice for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub recommendation: Recommendation,
    /// price / ATR14, absent when the engine could not compute it
    pub atr_ratio: Option<Decimal>,
}

impl Advice {
    pub fn hold() -> Self {
        Self {
            recommendation: Recommendation::Hold,
            atr_ratio: None,
        }
    }
}

/// Read side of the recommendation snapshot
pub trait AdviceSource: Send + Sync {
    /// Latest advice for a symbol, if any has been published
    fn latest(&self, symbol: &str) -> Option<Advice>;
}

/// In-memory snapshot the surrounding application publishes into
///
/// Snapshots are replaced wholesale; readers always see a consistent map.
#[derive(Default)]
pub struct AdviceBook {
    inner: RwLock<HashMap<String, Advice>>,
}

impl AdviceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot
    pub fn publish(&self, snapshot: HashMap<String, Advice>) {
        *self.inner.write().expect("advice lock poisoned") = snapshot;
    }

    /// Update a single symbol
    pub fn set(&self, symbol: impl Into<String>, advice: Advice) {
        self.inner
            .write()
            .expect("advice lock poisoned")
            .insert(symbol.into(), advice);
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("advice lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AdviceSource for AdviceBook {
    fn latest(&self, symbol: &str) -> Option<Advice> {
        self.inner
            .read()
            .expect("advice lock poisoned")
            .get(symbol)
            .copied()
    }
}
