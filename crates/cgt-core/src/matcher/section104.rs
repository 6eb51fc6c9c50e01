//! Section 104 pool matching rule (spec §4.7).
//!
//! Consumes whatever quantity Same-Day and Bed-&-Breakfast left unmatched
//! against the symbol's averaged-cost pool.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::audit::{AuditEntry, RuleTag, symbol_category};
use crate::decimal::normalize_amount;
use crate::error::CgtError;
use crate::position::PositionStore;

/// Apply the Section 104 rule to whatever disposal quantity remains.
///
/// Returns `None` if `qty_rem` is zero. Errors with
/// [`CgtError::InvariantViolation`] if `qty_rem` exceeds the pool — Same-Day
/// and B&B should already have converted any excess into a short position
/// before this rule runs.
pub fn apply(
    positions: &mut PositionStore,
    symbol: &str,
    date: NaiveDate,
    price: Decimal,
    fees_orig_total: Decimal,
    fees_orig_qty: Decimal,
    qty_rem: Decimal,
) -> Result<Option<AuditEntry>, CgtError> {
    if qty_rem <= Decimal::ZERO {
        return Ok(None);
    }

    let pool = positions.pool(symbol);
    if qty_rem > pool.quantity {
        return Err(CgtError::InvariantViolation(format!(
            "Section 104 disposal of {qty_rem} for {symbol} on {date} exceeds pool quantity {}",
            pool.quantity
        )));
    }

    let amount_delta = normalize_amount(qty_rem * pool.pooled_cost_gbp / pool.quantity);
    let fees = if fees_orig_qty == Decimal::ZERO {
        Decimal::ZERO
    } else {
        fees_orig_total * qty_rem / fees_orig_qty
    };
    let proceeds = qty_rem * price;
    let allowable_cost = amount_delta + fees;
    let gain = proceeds - allowable_cost;

    positions.adjust_pool(symbol, -qty_rem, -amount_delta);
    let post = positions.pool(symbol);

    Ok(Some(AuditEntry {
        date,
        category: symbol_category("sell", symbol),
        rule: RuleTag::Section104,
        symbol: symbol.to_string(),
        quantity: qty_rem,
        gross_amount: qty_rem * price,
        fees,
        allowable_cost,
        gain_or_loss: gain,
        post_quantity: post.quantity,
        post_cost: post.pooled_cost_gbp,
        acquisition_date: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn averages_cost_across_two_acquisitions() {
        let mut positions = PositionStore::new();
        positions.adjust_pool("AAPL", dec!(100), dec!(15000));
        positions.adjust_pool("AAPL", dec!(100), dec!(13000));

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let entry = apply(&mut positions, "AAPL", date, dec!(120), dec!(0), dec!(100), dec!(100))
            .unwrap()
            .unwrap();

        assert_eq!(entry.gain_or_loss, dec!(-2000));
        assert_eq!(positions.pool("AAPL").quantity, dec!(100));
        assert_eq!(positions.pool("AAPL").pooled_cost_gbp, dec!(14000));
    }

    #[test]
    fn errors_when_disposal_exceeds_the_pool() {
        let mut positions = PositionStore::new();
        positions.adjust_pool("AAPL", dec!(50), dec!(5000));
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let result = apply(&mut positions, "AAPL", date, dec!(100), dec!(0), dec!(100), dec!(100));
        assert!(matches!(result, Err(CgtError::InvariantViolation(_))));
    }

    #[test]
    fn returns_none_for_zero_remaining_quantity() {
        let mut positions = PositionStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let result = apply(&mut positions, "AAPL", date, dec!(100), dec!(0), dec!(100), Decimal::ZERO)
            .unwrap();
        assert!(result.is_none());
    }
}
