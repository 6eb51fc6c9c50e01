//! The FX oracle contract consumed by the calculation engine.
//!
//! The engine never parses XML or touches a filesystem; it only ever asks
//! "what is the GBP value of this amount on this date" through this trait,
//! which `FxCache` implements using whichever source mode (Monthly or Daily)
//! the caller populated it with.

use crate::amount::FxConversionError;
use crate::cache::FxCache;
use crate::CurrencyAmount;
use chrono::NaiveDate;
use iso_currency::Currency;
use rust_decimal::Decimal;

/// Resolves currency amounts to GBP on a given date.
///
/// Implementations may be synchronous in-memory lookups (as `FxCache` is
/// here); nothing in this trait requires async machinery.
pub trait FxOracle {
    fn rate_to_gbp(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, FxConversionError>;

    fn convert(&self, amount: &CurrencyAmount, date: NaiveDate) -> Result<Decimal, FxConversionError> {
        if amount.is_gbp() {
            return Ok(amount.amount);
        }
        let rate = self.rate_to_gbp(amount.currency, date)?;
        Ok(amount.amount / rate)
    }
}

/// Monthly-mode oracle: one HMRC period rate per calendar month.
pub struct MonthlyOracle<'a>(pub &'a FxCache);

impl FxOracle for MonthlyOracle<'_> {
    fn rate_to_gbp(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, FxConversionError> {
        use chrono::Datelike;
        self.0
            .get(currency, date.year(), date.month())
            .map(|entry| entry.rate_per_gbp)
            .ok_or_else(|| FxConversionError::MissingRate {
                currency: currency.code().to_string(),
                year: date.year(),
                month: date.month(),
            })
    }
}

/// Daily-mode oracle: one rate per calendar day, weekends carried back to
/// the preceding Friday, falling back to the Monthly table when absent.
pub struct DailyOracle<'a>(pub &'a FxCache);

impl FxOracle for DailyOracle<'_> {
    fn rate_to_gbp(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, FxConversionError> {
        use chrono::Datelike;
        self.0
            .get_daily(currency, date)
            .ok_or_else(|| FxConversionError::MissingRate {
                currency: currency.code().to_string(),
                year: date.year(),
                month: date.month(),
            })
    }
}
