//! Same-Day matching rule (spec §4.5).
//!
//! Matches a disposal against acquisitions of the same security recorded on
//! the same day. Aggregation in [`crate::txlog::TransactionLog`] is additive,
//! so same-day acquisitions are already a single pooled aggregate by the time
//! this rule runs — there is no intra-day ordering policy to apply.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::audit::{AuditEntry, RuleTag, symbol_category};
use crate::decimal::normalize_amount;
use crate::position::PositionStore;
use crate::txlog::TransactionLog;
use crate::warnings::Warning;

/// Apply the Same-Day rule to a disposal, consuming same-day acquisitions
/// and reducing `qty_rem` by however much was matched.
///
/// Returns `None` if no same-day acquisition is available for `symbol`.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    acquisitions: &mut TransactionLog,
    positions: &mut PositionStore,
    symbol: &str,
    date: NaiveDate,
    price: Decimal,
    fees_orig_total: Decimal,
    fees_orig_qty: Decimal,
    qty_rem: &mut Decimal,
    warnings: &mut Vec<Warning>,
) -> Option<AuditEntry> {
    let available = acquisitions.get(date, symbol).quantity;
    if available <= Decimal::ZERO || *qty_rem <= Decimal::ZERO {
        return None;
    }

    let matched = (*qty_rem).min(available);
    let taken = acquisitions.consume(date, symbol, matched);

    let fees = if fees_orig_qty == Decimal::ZERO {
        Decimal::ZERO
    } else {
        fees_orig_total * matched / fees_orig_qty
    };
    let acq_cost = normalize_amount(taken.amount_gbp);
    let proceeds = matched * price;
    let allowable_cost = acq_cost + fees;
    let gain = proceeds - allowable_cost;

    positions.adjust_pool(symbol, -matched, -acq_cost);
    *qty_rem -= matched;

    let post = positions.pool(symbol);
    if post.quantity == Decimal::ZERO && post.pooled_cost_gbp.abs() >= Decimal::new(1, 23) {
        warnings.push(Warning::data_quality(
            symbol,
            date,
            "pool cost did not round to zero after same-day disposal emptied the pool",
        ));
    }

    Some(AuditEntry {
        date,
        category: symbol_category("sell", symbol),
        rule: RuleTag::SameDay,
        symbol: symbol.to_string(),
        quantity: matched,
        gross_amount: matched * price,
        fees,
        allowable_cost,
        gain_or_loss: gain,
        post_quantity: post.quantity,
        post_cost: post.pooled_cost_gbp,
        acquisition_date: Some(date),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn matches_same_day_acquisition_and_reduces_remaining() {
        let mut acquisitions = TransactionLog::new();
        let mut positions = PositionStore::new();
        acquisitions.append(date(), "AAPL", dec!(100), dec!(15010), dec!(10), &[]);
        positions.adjust_pool("AAPL", dec!(100), dec!(15010));

        let mut qty_rem = dec!(100);
        let mut warnings = Vec::new();
        let entry = apply(
            &mut acquisitions,
            &mut positions,
            "AAPL",
            date(),
            dec!(160),
            dec!(12),
            dec!(100),
            &mut qty_rem,
            &mut warnings,
        )
        .expect("same-day match");

        assert_eq!(qty_rem, Decimal::ZERO);
        assert_eq!(entry.gain_or_loss, dec!(978));
        assert_eq!(positions.pool("AAPL").quantity, Decimal::ZERO);
    }

    #[test]
    fn returns_none_without_a_same_day_acquisition() {
        let mut acquisitions = TransactionLog::new();
        let mut positions = PositionStore::new();
        let mut qty_rem = dec!(50);
        let mut warnings = Vec::new();
        let entry = apply(
            &mut acquisitions,
            &mut positions,
            "AAPL",
            date(),
            dec!(160),
            dec!(0),
            dec!(50),
            &mut qty_rem,
            &mut warnings,
        );
        assert!(entry.is_none());
        assert_eq!(qty_rem, dec!(50));
    }
}
