//! Exact-decimal quantization and budget-constrained sizing
//!
//! Every price or quantity that reaches the order-placement boundary must
//! already satisfy the symbol's tick, step and notional constraints. The
//! methods here are the only path to that compliance.

use rust_decimal::Decimal;

use super::filters::SymbolFilters;

impl SymbolFilters {
    /// Floor a price to the nearest tick multiple at or below it
    pub fn round_price(&self, price: Decimal) -> Decimal {
        floor_to_increment(price, self.tick_size)
    }

    /// Floor a quantity to the step, raising to exactly `min_qty` when below
    ///
    /// The raise may exceed the caller's requested quantity; the result is
    /// authoritative, not a refinement.
    pub fn round_qty(&self, qty: Decimal) -> Decimal {
        let floored = floor_to_increment(qty, self.step_size);
        if floored < self.min_qty {
            self.min_qty
        } else {
            floored
        }
    }

    /// Floor a quantity to the step with no minimum raise
    ///
    /// Used when trimming a sell down to available balance, where rounding
    /// up would oversell.
    pub fn floor_qty(&self, qty: Decimal) -> Decimal {
        floor_to_increment(qty, self.step_size)
    }

    /// Largest compliant quantity purchasable within `budget` at `price`
    ///
    /// Returns zero when the minimum-notional quantity cannot be met within
    /// budget (refuse rather than exceed budget), or when price/budget are
    /// non-positive.
    pub fn size_order(&self, price: Decimal, budget: Decimal) -> Decimal {
        if price <= Decimal::ZERO || budget <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut qty = floor_to_increment(budget / price, self.step_size);
        if qty < self.min_qty {
            qty = self.min_qty;
        }

        if qty * price < self.min_notional {
            qty = ceil_to_increment(self.min_notional / price, self.step_size);
            if qty < self.min_qty {
                qty = self.min_qty;
            }
        }

        if qty * price > budget {
            Decimal::ZERO
        } else {
            qty
        }
    }
}

fn floor_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }
    (value / increment).floor() * increment
}

fn ceil_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }
    (value / increment).ceil() * increment
}
