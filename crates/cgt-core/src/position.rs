//! Per-symbol Section 104 pool and short-position FIFO queue.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// A symbol's Section 104 pool: a single averaged-cost holding.
///
/// `pooled_cost_gbp` can transiently go slightly negative from ERI
/// reductions or rounding; callers surface a `DataQuality` warning rather
/// than treating it as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Section104Position {
    pub quantity: Decimal,
    pub pooled_cost_gbp: Decimal,
}

/// One open short sale awaiting cover. `net_proceeds_gbp` is already net of
/// the selling fees proportional to this slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortLot {
    pub quantity: Decimal,
    pub net_proceeds_gbp: Decimal,
    pub open_date: NaiveDate,
    pub sell_fees_gbp: Decimal,
}

/// Owns every symbol's Section 104 pool and short FIFO queue for one computation.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    pools: HashMap<String, Section104Position>,
    shorts: HashMap<String, VecDeque<ShortLot>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self, symbol: &str) -> Section104Position {
        self.pools.get(symbol).copied().unwrap_or_default()
    }

    /// Add to a symbol's pool, removing it if quantity falls to (or below) zero.
    pub fn adjust_pool(&mut self, symbol: &str, qty_delta: Decimal, cost_delta: Decimal) {
        let pos = self.pools.entry(symbol.to_string()).or_default();
        pos.quantity += qty_delta;
        pos.pooled_cost_gbp += cost_delta;
        if pos.quantity <= Decimal::ZERO {
            self.pools.remove(symbol);
        }
    }

    /// Adjust a pool's cost only, leaving quantity untouched and skipping the
    /// zero-quantity removal `adjust_pool` applies. Used by ERI uplifts and
    /// spin-off cost transfers, neither of which changes share count; a
    /// spin-off destination may legitimately sit at zero quantity with a
    /// non-zero cost until its shares actually arrive.
    pub fn add_pool_cost(&mut self, symbol: &str, cost_delta: Decimal) {
        let pos = self.pools.entry(symbol.to_string()).or_default();
        pos.pooled_cost_gbp += cost_delta;
    }

    pub fn shorts(&self, symbol: &str) -> impl Iterator<Item = &ShortLot> {
        self.shorts.get(symbol).into_iter().flatten()
    }

    pub fn open_short_quantity(&self, symbol: &str) -> Decimal {
        self.shorts(symbol).map(|l| l.quantity).sum()
    }

    pub fn push_short(&mut self, symbol: &str, lot: ShortLot) {
        self.shorts.entry(symbol.to_string()).or_default().push_back(lot);
    }

    /// Pop cover quantity off the front of `symbol`'s short FIFO queue,
    /// splitting the front lot if it's larger than `cover_qty`.
    pub fn pop_short_cover(&mut self, symbol: &str, cover_qty: Decimal) -> Option<ShortLot> {
        let queue = self.shorts.get_mut(symbol)?;
        let front = queue.front_mut()?;
        if front.quantity <= cover_qty {
            let lot = queue.pop_front().unwrap();
            if queue.is_empty() {
                self.shorts.remove(symbol);
            }
            Some(lot)
        } else {
            let fraction = cover_qty / front.quantity;
            let taken = ShortLot {
                quantity: cover_qty,
                net_proceeds_gbp: front.net_proceeds_gbp * fraction,
                open_date: front.open_date,
                sell_fees_gbp: front.sell_fees_gbp * fraction,
            };
            front.quantity -= cover_qty;
            front.net_proceeds_gbp -= taken.net_proceeds_gbp;
            front.sell_fees_gbp -= taken.sell_fees_gbp;
            Some(taken)
        }
    }

    /// Every symbol with a non-empty pool, for portfolio reporting.
    pub fn pool_symbols(&self) -> impl Iterator<Item = &String> {
        self.pools.keys()
    }

    /// Every symbol with an open short, for `OpenPosition` warnings at year-end.
    pub fn short_symbols(&self) -> impl Iterator<Item = &String> {
        self.shorts.keys()
    }
}
