//! The report assembler (spec §4.11 step 5, §6 "Report consumer").
//!
//! Flattens the audit log into disposal lines and totals the chargeable
//! gain/loss for the requested tax year. `Report` is read-only once
//! returned from [`crate::engine::Engine::calculate`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::decimal::round_half_up;
use crate::models::TaxPeriod;
use crate::position::{Section104Position, ShortLot};
use crate::warnings::Warning;

/// One symbol's dividend total for the tax year, summed per `(date, symbol)`
/// then grouped here by symbol for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DividendLine {
    pub date: NaiveDate,
    pub symbol: String,
    pub net_amount_gbp: Decimal,
}

/// One `(broker, currency, month)` interest total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InterestLine {
    pub broker: String,
    pub currency: String,
    pub month: NaiveDate,
    pub amount_gbp: Decimal,
}

/// One `(date, symbol)` ERI total distributed across B&B-matched shares
/// (spec §9 Open Question 2). A flattened line rather than a
/// `(NaiveDate, String)`-keyed map, since that tuple key has no JSON object
/// representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EriDistributionLine {
    pub date: NaiveDate,
    pub symbol: String,
    pub amount_gbp: Decimal,
}

/// A symbol's closing Section 104 pool, for the portfolio snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoolSnapshot {
    pub quantity: Decimal,
    pub pooled_cost_gbp: Decimal,
}

/// An open short position at the snapshot boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShortSnapshot {
    pub quantity: Decimal,
    pub net_proceeds_gbp: Decimal,
    pub open_date: NaiveDate,
}

/// Closing positions across every symbol the engine ever touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Portfolio {
    pub pools: BTreeMap<String, PoolSnapshot>,
    pub shorts: BTreeMap<String, Vec<ShortSnapshot>>,
}

impl Portfolio {
    pub(crate) fn from_positions(
        pools: impl Iterator<Item = (String, Section104Position)>,
        shorts: impl Iterator<Item = (String, Vec<ShortLot>)>,
    ) -> Self {
        let mut portfolio = Portfolio::default();
        for (symbol, pos) in pools {
            portfolio.pools.insert(
                symbol,
                PoolSnapshot {
                    quantity: pos.quantity,
                    pooled_cost_gbp: pos.pooled_cost_gbp,
                },
            );
        }
        for (symbol, lots) in shorts {
            let snapshots = lots
                .into_iter()
                .map(|l| ShortSnapshot {
                    quantity: l.quantity,
                    net_proceeds_gbp: l.net_proceeds_gbp,
                    open_date: l.open_date,
                })
                .collect();
            portfolio.shorts.insert(symbol, snapshots);
        }
        portfolio
    }
}

/// The result of one `calculate()` call for a single UK tax year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub tax_year: TaxPeriod,
    /// Sum of every positive per-rule gain within the tax year, rounded to 2dp.
    pub capital_gain: Decimal,
    /// Sum of every negative per-rule gain within the tax year (negative value), rounded to 2dp.
    pub capital_loss: Decimal,
    pub allowance: Decimal,
    pub calculation_log: Vec<AuditEntry>,
    pub dividends: Vec<DividendLine>,
    pub interest: Vec<InterestLine>,
    /// Per-`(date, symbol)` ERI distributed across B&B-matched shares,
    /// gated to the target tax year (spec §9 Open Question 2).
    pub eris_distribution: Vec<EriDistributionLine>,
    pub portfolio: Portfolio,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn taxable_gain(&self) -> Decimal {
        round_half_up((self.capital_gain + self.capital_loss - self.allowance).max(Decimal::ZERO), 2)
    }
}
