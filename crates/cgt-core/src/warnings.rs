//! Non-fatal diagnostics accumulated during a `calculate` call.
//!
//! The engine has no logging crate in its dependency tree; every diagnostic
//! it wants to surface becomes a [`Warning`] returned as first-class data on
//! the [`crate::report::Report`] instead of a log line.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    MissingData,
    DataQuality,
    Matching,
    Position,
    OpenPosition,
}

/// A single non-fatal diagnostic raised while processing transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    pub severity: Severity,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub detail: String,
}

impl Warning {
    pub fn data_quality(symbol: &str, date: NaiveDate, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: Category::DataQuality,
            symbol: Some(symbol.to_string()),
            date: Some(date),
            detail: detail.into(),
        }
    }

    pub fn open_position(symbol: &str, quantity: Decimal) -> Self {
        Self {
            severity: Severity::Warning,
            category: Category::OpenPosition,
            symbol: Some(symbol.to_string()),
            date: None,
            detail: format!("{quantity} shares remain an open short position at tax-year end"),
        }
    }

    pub fn matching(symbol: &str, date: NaiveDate, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: Category::Matching,
            symbol: Some(symbol.to_string()),
            date: Some(date),
            detail: detail.into(),
        }
    }

    pub fn missing_data_info(symbol: &str, date: NaiveDate, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            category: Category::MissingData,
            symbol: Some(symbol.to_string()),
            date: Some(date),
            detail: detail.into(),
        }
    }

    pub fn position(symbol: &str, date: NaiveDate, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: Category::Position,
            symbol: Some(symbol.to_string()),
            date: Some(date),
            detail: detail.into(),
        }
    }
}
