//! Share matching: Same-Day, Bed-&-Breakfast, and Section 104, applied in
//! strict precedence to a single disposal (spec §4.5–§4.7).

pub mod bed_and_breakfast;
pub mod same_day;
pub mod section104;

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::audit::AuditEntry;
use crate::error::CgtError;
use crate::position::PositionStore;
use crate::txlog::TransactionLog;
use crate::warnings::Warning;

/// Apply Same-Day, then Bed-&-Breakfast, then Section 104 to one disposal.
///
/// Any quantity still unmatched after Section 104 is the caller's
/// responsibility (spec §4.9 opens a short for it before this function is
/// ever called; by the time this runs the disposal's logged quantity is
/// already capped at what the pool can cover).
#[allow(clippy::too_many_arguments)]
pub fn match_disposal(
    acquisitions: &mut TransactionLog,
    bnb_consumed: &mut TransactionLog,
    disposals: &TransactionLog,
    positions: &mut PositionStore,
    eris: &HashMap<(NaiveDate, String), Decimal>,
    splits: &HashMap<(String, NaiveDate), Decimal>,
    symbol: &str,
    date: NaiveDate,
    qty: Decimal,
    amount_gbp: Decimal,
    fees_gbp: Decimal,
    tax_year: i32,
    eris_distribution: &mut HashMap<(NaiveDate, String), Decimal>,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<AuditEntry>, CgtError> {
    let mut entries = Vec::new();
    let mut qty_rem = qty;
    let price = if qty == Decimal::ZERO {
        Decimal::ZERO
    } else {
        amount_gbp / qty
    };

    if let Some(entry) = same_day::apply(
        acquisitions,
        positions,
        symbol,
        date,
        price,
        fees_gbp,
        qty,
        &mut qty_rem,
        warnings,
    ) {
        entries.push(entry);
    }

    if qty_rem > Decimal::ZERO {
        entries.extend(bed_and_breakfast::apply(
            acquisitions,
            bnb_consumed,
            disposals,
            positions,
            eris,
            splits,
            symbol,
            date,
            price,
            fees_gbp,
            qty,
            &mut qty_rem,
            tax_year,
            eris_distribution,
            warnings,
        )?);
    }

    if qty_rem > Decimal::ZERO
        && let Some(entry) = section104::apply(positions, symbol, date, price, fees_gbp, qty, qty_rem)?
    {
        entries.push(entry);
    }

    Ok(entries)
}
