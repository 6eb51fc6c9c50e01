//! Corporate-action handlers: ERI uplift and spin-off cost transfer (spec §4.11).
//!
//! Stock splits are not handled here — their effect is a `(symbol, day)`
//! multiplier consulted only inside the Bed-&-Breakfast window (spec §4.6
//! step 1); outside that window a split simply arrives as a zero-cost
//! acquisition through the normal acquisition path (spec §4.10).

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::audit::{AuditEntry, RuleTag, spinoff_category, symbol_category};
use crate::position::PositionStore;

/// A spin-off corporate action transferring a proportion of a parent
/// holding's cost basis to a newly created (or existing) destination symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinOffEvent {
    pub date: NaiveDate,
    pub source_symbol: String,
    pub dest_symbol: String,
    pub cost_proportion: Decimal,
}

/// Uplift `symbol`'s pool cost by `pool_qty * amount_per_share`.
///
/// ERI with no position is silently skipped (spec §4.13): returns `None`
/// when the pool is empty, rather than materializing a zero-quantity
/// position purely to record an audit entry for it.
pub fn apply_eri(
    positions: &mut PositionStore,
    symbol: &str,
    date: NaiveDate,
    amount_per_share: Decimal,
) -> Option<AuditEntry> {
    let pool = positions.pool(symbol);
    if pool.quantity <= Decimal::ZERO {
        return None;
    }

    let uplift = pool.quantity * amount_per_share;
    positions.add_pool_cost(symbol, uplift);
    let post = positions.pool(symbol);

    Some(AuditEntry {
        date,
        category: symbol_category("eri", symbol),
        rule: RuleTag::Eri,
        symbol: symbol.to_string(),
        quantity: pool.quantity,
        gross_amount: Decimal::ZERO,
        fees: Decimal::ZERO,
        allowable_cost: uplift,
        gain_or_loss: Decimal::ZERO,
        post_quantity: post.quantity,
        post_cost: post.pooled_cost_gbp,
        acquisition_date: None,
    })
}

/// Transfer `cost_proportion * parent.pooled_cost_gbp` from the source
/// symbol's pool to the destination symbol's pool, creating the destination
/// with zero quantity if it doesn't yet hold any shares.
///
/// Returns `(parent_reduction, dest_addition)`, both tagged `SECTION_104`
/// per spec §4.11 step 2 ("two audit entries tagged SECTION_104").
pub fn apply_spinoff(
    positions: &mut PositionStore,
    event: &SpinOffEvent,
) -> (AuditEntry, AuditEntry) {
    let parent = positions.pool(&event.source_symbol);
    let transferred = parent.pooled_cost_gbp * event.cost_proportion;

    positions.add_pool_cost(&event.source_symbol, -transferred);
    positions.add_pool_cost(&event.dest_symbol, transferred);

    let parent_post = positions.pool(&event.source_symbol);
    let dest_post = positions.pool(&event.dest_symbol);
    let category = spinoff_category(&event.source_symbol, &event.dest_symbol);

    let parent_entry = AuditEntry {
        date: event.date,
        category: category.clone(),
        rule: RuleTag::SpinOff,
        symbol: event.source_symbol.clone(),
        quantity: parent_post.quantity,
        gross_amount: Decimal::ZERO,
        fees: Decimal::ZERO,
        allowable_cost: -transferred,
        gain_or_loss: Decimal::ZERO,
        post_quantity: parent_post.quantity,
        post_cost: parent_post.pooled_cost_gbp,
        acquisition_date: None,
    };
    let dest_entry = AuditEntry {
        date: event.date,
        category,
        rule: RuleTag::SpinOff,
        symbol: event.dest_symbol.clone(),
        quantity: dest_post.quantity,
        gross_amount: Decimal::ZERO,
        fees: Decimal::ZERO,
        allowable_cost: transferred,
        gain_or_loss: Decimal::ZERO,
        post_quantity: dest_post.quantity,
        post_cost: dest_post.pooled_cost_gbp,
        acquisition_date: None,
    };

    (parent_entry, dest_entry)
}
