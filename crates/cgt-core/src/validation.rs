//! Input validation for broker-native transactions.
//!
//! Pre-calculation validation that catches obviously invalid feeds — zero or
//! negative quantities, negative prices/fees, a disposal with no prior
//! acquisition — before they reach [`crate::engine::Engine`], with messages
//! that point back at the offending line.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::models::{RawAction, RawTransaction};

/// Result of validating a transaction feed.
///
/// Serializes with an additional `is_valid` field derived from [`Self::is_valid`].
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent calculation.
    pub errors: Vec<ValidationError>,
    /// Warnings that don't prevent calculation but may indicate issues.
    pub warnings: Vec<ValidationWarning>,
}

impl Serialize for ValidationResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are no errors or warnings.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// A validation error that prevents calculation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// Line number in the original feed (1-indexed), if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub date: NaiveDate,
    pub symbol: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Error (line {line}): {} on {} - {}", self.symbol, self.date, self.message),
            None => write!(f, "Error: {} on {} - {}", self.symbol, self.date, self.message),
        }
    }
}

/// A validation warning that doesn't prevent calculation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub date: NaiveDate,
    pub symbol: String,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Warning (line {line}): {} on {} - {}", self.symbol, self.date, self.message),
            None => write!(f, "Warning: {} on {} - {}", self.symbol, self.date, self.message),
        }
    }
}

/// Fields common to Buy and Sell, checked together.
struct TradeFields<'a> {
    action: &'a str,
    quantity: Decimal,
    price: Option<Decimal>,
    fees: Decimal,
}

fn check_trade_fields(
    result: &mut ValidationResult,
    line: Option<usize>,
    date: NaiveDate,
    symbol: &str,
    fields: &TradeFields<'_>,
) {
    if fields.quantity == Decimal::ZERO {
        result.errors.push(ValidationError {
            line,
            date,
            symbol: symbol.to_string(),
            message: format!("{} with zero quantity", fields.action),
        });
    } else if fields.quantity < Decimal::ZERO {
        result.errors.push(ValidationError {
            line,
            date,
            symbol: symbol.to_string(),
            message: format!("{} with negative quantity: {}", fields.action, fields.quantity),
        });
    }

    if let Some(price) = fields.price
        && price < Decimal::ZERO
    {
        result.errors.push(ValidationError {
            line,
            date,
            symbol: symbol.to_string(),
            message: format!("{} with negative price: {}", fields.action, price),
        });
    }

    if fields.fees < Decimal::ZERO {
        result.errors.push(ValidationError {
            line,
            date,
            symbol: symbol.to_string(),
            message: format!("{} with negative fees: {}", fields.action, fields.fees),
        });
    }
}

/// Validate a broker-native transaction feed before handing it to the engine.
///
/// Checks for:
/// - Zero/negative quantities on Buy, Sell, StockActivity
/// - Negative prices and fees
/// - Zero/negative split ratios on StockSplit
/// - Sells before any acquisition of the same symbol (warning)
pub fn validate(transactions: &[RawTransaction]) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut first_acquisition: HashMap<&str, NaiveDate> = HashMap::new();

    for (i, tx) in transactions.iter().enumerate() {
        let line = Some(i + 1);
        let symbol = tx.symbol.as_deref().unwrap_or(tx.broker.as_str());

        match tx.action {
            RawAction::Buy | RawAction::StockActivity => {
                if let Some(qty) = tx.quantity {
                    check_trade_fields(
                        &mut result,
                        line,
                        tx.date,
                        symbol,
                        &TradeFields {
                            action: "BUY",
                            quantity: qty,
                            price: tx.price,
                            fees: tx.fees,
                        },
                    );
                }
                first_acquisition
                    .entry(symbol)
                    .and_modify(|d| {
                        if tx.date < *d {
                            *d = tx.date;
                        }
                    })
                    .or_insert(tx.date);
            }

            RawAction::Sell => {
                if let Some(qty) = tx.quantity {
                    check_trade_fields(
                        &mut result,
                        line,
                        tx.date,
                        symbol,
                        &TradeFields {
                            action: "SELL",
                            quantity: qty,
                            price: tx.price,
                            fees: tx.fees,
                        },
                    );
                }

                match first_acquisition.get(symbol) {
                    Some(&first_date) if tx.date < first_date => {
                        result.warnings.push(ValidationWarning {
                            line,
                            date: tx.date,
                            symbol: symbol.to_string(),
                            message: format!("SELL before first acquisition (first acquisition: {first_date})"),
                        });
                    }
                    None => {
                        result.warnings.push(ValidationWarning {
                            line,
                            date: tx.date,
                            symbol: symbol.to_string(),
                            message: "SELL with no prior acquisition for this symbol".to_string(),
                        });
                    }
                    _ => {}
                }
            }

            RawAction::StockSplit => match tx.split_ratio {
                Some(ratio) if ratio == Decimal::ZERO => {
                    result.errors.push(ValidationError {
                        line,
                        date: tx.date,
                        symbol: symbol.to_string(),
                        message: "STOCK_SPLIT with zero ratio".to_string(),
                    });
                }
                Some(ratio) if ratio < Decimal::ZERO => {
                    result.errors.push(ValidationError {
                        line,
                        date: tx.date,
                        symbol: symbol.to_string(),
                        message: format!("STOCK_SPLIT with negative ratio: {ratio}"),
                    });
                }
                None => {
                    result.errors.push(ValidationError {
                        line,
                        date: tx.date,
                        symbol: symbol.to_string(),
                        message: "STOCK_SPLIT with no ratio".to_string(),
                    });
                }
                _ => {}
            },

            RawAction::Dividend | RawAction::DividendTax | RawAction::Interest | RawAction::ExcessReportedIncome => {
                if tx.amount.is_none() {
                    result.errors.push(ValidationError {
                        line,
                        date: tx.date,
                        symbol: symbol.to_string(),
                        message: format!("{:?} with no amount", tx.action),
                    });
                }
            }

            RawAction::SpinOff => {
                if tx.description.is_none() {
                    result.errors.push(ValidationError {
                        line,
                        date: tx.date,
                        symbol: symbol.to_string(),
                        message: "SPIN_OFF with no source symbol in description".to_string(),
                    });
                }
            }

            RawAction::Fee
            | RawAction::Transfer
            | RawAction::CashMerger
            | RawAction::FullRedemption
            | RawAction::Adjustment
            | RawAction::CapitalGain
            | RawAction::ReinvestShares
            | RawAction::ReinvestDividends
            | RawAction::WireFundsReceived => {}
        }
    }

    result
}
