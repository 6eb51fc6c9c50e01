//! Bed-&-Breakfast matching rule (spec §4.6).
//!
//! Looks forward from a disposal date `D` over `D+1 ..= D+30` for the first
//! acquisitions with spare quantity. Consumption of a future acquisition is
//! recorded into `bnb_consumed` rather than mutating the acquisition itself,
//! since the day-driver has not reached that day yet — see the "Cyclic
//! aggregation during B&B" design note.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::audit::{AuditEntry, RuleTag, symbol_category};
use crate::calendar::{bnb_window, in_tax_year};
use crate::decimal::normalize_amount;
use crate::error::CgtError;
use crate::position::PositionStore;
use crate::txlog::TransactionLog;
use crate::warnings::Warning;

/// Apply the Bed-&-Breakfast rule to a disposal's residual quantity.
///
/// `eris` maps `(date, symbol)` to the ERI amount-per-share announced that
/// day; `splits` maps `(symbol, date)` to the split multiplier applied that
/// day. `eris_distribution` accumulates per-`(date, symbol)` ERI amounts
/// distributed across matched shares, gated to the target tax year, for the
/// report's income breakdown (spec §9 Open Question 2).
#[allow(clippy::too_many_arguments)]
pub fn apply(
    acquisitions: &TransactionLog,
    bnb_consumed: &mut TransactionLog,
    disposals: &TransactionLog,
    positions: &mut PositionStore,
    eris: &HashMap<(NaiveDate, String), Decimal>,
    splits: &HashMap<(String, NaiveDate), Decimal>,
    symbol: &str,
    disposal_date: NaiveDate,
    price: Decimal,
    fees_orig_total: Decimal,
    fees_orig_qty: Decimal,
    qty_rem: &mut Decimal,
    tax_year: i32,
    eris_distribution: &mut HashMap<(NaiveDate, String), Decimal>,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<AuditEntry>, CgtError> {
    let mut entries = Vec::new();
    let mut split_multiplier = Decimal::ONE;
    let mut window_eris: Vec<(NaiveDate, Decimal)> = Vec::new();
    if let Some(amount) = eris.get(&(disposal_date, symbol.to_string())) {
        window_eris.push((disposal_date, *amount));
    }

    for day in bnb_window(disposal_date) {
        if *qty_rem <= Decimal::ZERO {
            break;
        }

        if let Some(factor) = splits.get(&(symbol.to_string(), day)) {
            split_multiplier *= factor;
        }
        if let Some(amount) = eris.get(&(day, symbol.to_string())) {
            window_eris.push((day, *amount));
        }

        if !acquisitions.has(day, symbol) {
            continue;
        }

        let a = acquisitions.get(day, symbol);
        let consumed = bnb_consumed.get(day, symbol);
        let disposed = disposals.get(day, symbol);

        if consumed.quantity > a.quantity {
            return Err(CgtError::InvariantViolation(format!(
                "B&B consumed {} exceeds acquired {} for {symbol} on {day}",
                consumed.quantity, a.quantity
            )));
        }
        if disposed.quantity > a.quantity {
            continue;
        }

        let adjusted_qty = a.quantity / split_multiplier;
        let available_adj = adjusted_qty - disposed.quantity - consumed.quantity;
        if available_adj <= Decimal::ZERO {
            continue;
        }
        if a.amount_gbp == Decimal::ZERO {
            warnings.push(Warning::matching(
                symbol,
                day,
                "zero-cost acquisition inside the B&B window, likely an intra-window split",
            ));
            continue;
        }

        let matched = (*qty_rem).min(available_adj);
        let fees = if fees_orig_qty == Decimal::ZERO {
            Decimal::ZERO
        } else {
            fees_orig_total * matched / fees_orig_qty
        };
        let acq_cost = normalize_amount(matched * a.amount_gbp / adjusted_qty);
        let proceeds = matched * price;
        let allowable_cost = acq_cost + fees;
        let gain = proceeds - allowable_cost;

        let mut dist_total = Decimal::ZERO;
        for (eri_date, eri_amount) in &window_eris {
            let dist = matched * eri_amount;
            if in_tax_year(*eri_date, tax_year) {
                *eris_distribution
                    .entry((*eri_date, symbol.to_string()))
                    .or_insert(Decimal::ZERO) += dist;
            }
            dist_total += dist;
        }

        let pool = positions.pool(symbol);
        let amount_delta = if pool.quantity == Decimal::ZERO {
            Decimal::ZERO
        } else {
            normalize_amount(matched * pool.pooled_cost_gbp / pool.quantity)
        };
        positions.adjust_pool(symbol, -matched, -amount_delta);

        let consumed_fraction = matched / adjusted_qty;
        let consumed_fees = a.fees_gbp * consumed_fraction;
        bnb_consumed.append(
            day,
            symbol,
            matched * split_multiplier,
            amount_delta + dist_total,
            consumed_fees,
            &[],
        );

        let post = positions.pool(symbol);
        entries.push(AuditEntry {
            date: disposal_date,
            category: symbol_category("sell", symbol),
            rule: RuleTag::BedAndBreakfast,
            symbol: symbol.to_string(),
            quantity: matched,
            gross_amount: matched * price,
            fees,
            allowable_cost,
            gain_or_loss: gain,
            post_quantity: post.quantity,
            post_cost: post.pooled_cost_gbp,
            acquisition_date: Some(day),
        });

        *qty_rem -= matched;
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn matches_an_acquisition_inside_the_thirty_day_window() {
        let mut acquisitions = TransactionLog::new();
        let mut bnb_consumed = TransactionLog::new();
        let disposals = TransactionLog::new();
        let mut positions = PositionStore::new();
        let eris = HashMap::new();
        let splits = HashMap::new();
        let mut eris_distribution = HashMap::new();
        let mut warnings = Vec::new();

        let disposal_date = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        let acq_date = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(); // D+30
        acquisitions.append(acq_date, "AAPL", dec!(100), dec!(14500), dec!(0), &[]);

        let mut qty_rem = dec!(100);
        let entries = apply(
            &acquisitions,
            &mut bnb_consumed,
            &disposals,
            &mut positions,
            &eris,
            &splits,
            "AAPL",
            disposal_date,
            dec!(150),
            dec!(0),
            dec!(100),
            &mut qty_rem,
            2024,
            &mut eris_distribution,
            &mut warnings,
        )
        .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(qty_rem, Decimal::ZERO);
        assert_eq!(entries[0].gain_or_loss, dec!(500));
    }

    #[test]
    fn day_31_is_outside_the_window() {
        let mut acquisitions = TransactionLog::new();
        let mut bnb_consumed = TransactionLog::new();
        let disposals = TransactionLog::new();
        let mut positions = PositionStore::new();
        let eris = HashMap::new();
        let splits = HashMap::new();
        let mut eris_distribution = HashMap::new();
        let mut warnings = Vec::new();

        let disposal_date = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        let acq_date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(); // D+31
        acquisitions.append(acq_date, "AAPL", dec!(100), dec!(14500), dec!(0), &[]);

        let mut qty_rem = dec!(100);
        let entries = apply(
            &acquisitions,
            &mut bnb_consumed,
            &disposals,
            &mut positions,
            &eris,
            &splits,
            "AAPL",
            disposal_date,
            dec!(150),
            dec!(0),
            dec!(100),
            &mut qty_rem,
            2024,
            &mut eris_distribution,
            &mut warnings,
        )
        .unwrap();

        assert!(entries.is_empty());
        assert_eq!(qty_rem, dec!(100));
    }

    #[test]
    fn skips_a_day_whose_acquisition_is_already_claimed_by_a_same_day_disposal() {
        let mut acquisitions = TransactionLog::new();
        let mut bnb_consumed = TransactionLog::new();
        let mut disposals = TransactionLog::new();
        let mut positions = PositionStore::new();
        let eris = HashMap::new();
        let splits = HashMap::new();
        let mut eris_distribution = HashMap::new();
        let mut warnings = Vec::new();

        let disposal_date = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        let acq_date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        acquisitions.append(acq_date, "AAPL", dec!(100), dec!(14500), dec!(0), &[]);
        disposals.append(acq_date, "AAPL", dec!(100), dec!(15000), dec!(0), &[]);

        let mut qty_rem = dec!(100);
        let entries = apply(
            &acquisitions,
            &mut bnb_consumed,
            &disposals,
            &mut positions,
            &eris,
            &splits,
            "AAPL",
            disposal_date,
            dec!(150),
            dec!(0),
            dec!(100),
            &mut qty_rem,
            2024,
            &mut eris_distribution,
            &mut warnings,
        )
        .unwrap();

        assert!(entries.is_empty());
        assert_eq!(qty_rem, dec!(100));
    }
}
