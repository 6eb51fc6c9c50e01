//! Exact decimal arithmetic helpers shared by every matching rule.
//!
//! All gain/loss arithmetic in this crate runs through [`rust_decimal::Decimal`]
//! rather than floating point, and every rounding step goes through one of the
//! two functions below so the rounding policy stays in one place.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round `v` to `places` decimal places using round-half-up (away from zero
/// on ties). Used for the final per-disposal chargeable gain, for display,
/// and wherever a value is about to leave the engine.
pub fn round_half_up(v: Decimal, places: u32) -> Decimal {
    v.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Round `v` to `places` decimal places using round-half-even (banker's
/// rounding). The default for intermediate arithmetic.
pub fn round_half_even(v: Decimal, places: u32) -> Decimal {
    v.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Normalize an amount that has just been converted across currencies or
/// derived from a ratio, capping the growth of fractional precision from
/// repeating decimals. Applied after every write-back to a pool.
pub fn normalize_amount(v: Decimal) -> Decimal {
    round_half_up(v, 10)
}

/// True iff `a` and `b` differ by less than one penny.
pub fn approx_equal(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < Decimal::new(1, 2)
}

/// The kind of transaction an `amount`/`price` pair is being cross-checked
/// for, purely to make mismatch error messages legible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationKind {
    Acquisition,
    Disposal,
}

/// True iff either the price recomputed from `amount` agrees with `price`
/// within 0.0001, or `amount` agrees with `qty * price + fees` (signed per
/// `kind`) within one penny.
///
/// Broker feeds routinely round `amount` and `price` independently, so
/// neither check alone is reliable; either one passing is sufficient.
pub fn approx_equal_price_rounding(
    amount: Decimal,
    qty: Decimal,
    price: Decimal,
    fees: Decimal,
    kind: ReconciliationKind,
) -> bool {
    if qty == Decimal::ZERO {
        return approx_equal(amount, Decimal::ZERO);
    }

    let (recomputed_price, expected) = match kind {
        ReconciliationKind::Acquisition => (
            (amount.abs() - fees) / qty,
            -(qty * price + fees),
        ),
        ReconciliationKind::Disposal => ((amount + fees) / qty, qty * price - fees),
    };

    let price_tolerance = Decimal::new(1, 4);
    if (recomputed_price - price).abs() < price_tolerance {
        return true;
    }

    approx_equal(amount, expected)
}
