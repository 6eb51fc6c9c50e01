//! The per-rule audit trail the report assembler flattens into disposal lines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which rule or handler produced an [`AuditEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleTag {
    SameDay,
    BedAndBreakfast,
    Section104,
    ShortCover,
    Eri,
    SpinOff,
    Acquisition,
    Dividend,
    Interest,
    /// Fee, Transfer, CashMerger, FullRedemption, Adjustment, CapitalGain,
    /// ReinvestShares, ReinvestDividends, and WireFundsReceived actions:
    /// recorded for completeness but not matched by any CGT rule.
    Other,
}

/// One applied rule's effect: disposed quantity, gross amount, apportioned
/// fees, computed gain or loss, allowable cost, and the resulting pool state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditEntry {
    pub date: NaiveDate,
    /// `(day_key, category_key)` grouping key, e.g. `sell$AAPL`, `short_cover$AAPL`.
    pub category: String,
    pub rule: RuleTag,
    pub symbol: String,
    pub quantity: Decimal,
    pub gross_amount: Decimal,
    pub fees: Decimal,
    pub allowable_cost: Decimal,
    pub gain_or_loss: Decimal,
    pub post_quantity: Decimal,
    pub post_cost: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
}

/// Category key for a two-symbol event (spin-off).
pub fn spinoff_category(source: &str, dest: &str) -> String {
    format!("spinoff${source}${dest}")
}

/// Category key for a single-symbol event.
pub fn symbol_category(prefix: &str, symbol: &str) -> String {
    format!("{prefix}${symbol}")
}

/// Category key for interest, grouped by broker and currency.
pub fn interest_category(broker: &str, currency: &str) -> String {
    format!("interest${broker}${currency}")
}
