use crate::types::{DailyRateKey, RateEntry, RateKey};
use chrono::{Datelike, NaiveDate, Weekday};
use iso_currency::Currency;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// If `date` falls on a Saturday or Sunday, return the preceding Friday.
/// Otherwise return `date` unchanged. HMRC publishes no weekend daily rates,
/// so the Daily source mode carries the last trading day's rate forward.
pub fn carry_back_weekend(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date - chrono::Duration::days(2),
        _ => date,
    }
}

#[derive(Debug, Default, Clone)]
pub struct FxCache {
    rates: HashMap<RateKey, RateEntry>,
    daily: HashMap<DailyRateKey, Decimal>,
}

impl FxCache {
    pub fn new() -> Self {
        Self {
            rates: HashMap::new(),
            daily: HashMap::new(),
        }
    }

    pub fn insert(&mut self, entry: RateEntry) {
        self.rates.insert(entry.key.clone(), entry);
    }

    pub fn extend(&mut self, entries: Vec<RateEntry>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Insert a Daily-mode rate (foreign currency units per 1 GBP) for one calendar day.
    pub fn insert_daily(&mut self, code: Currency, date: NaiveDate, rate_per_gbp: Decimal) {
        self.daily.insert(DailyRateKey { code, date }, rate_per_gbp);
    }

    pub fn get(&self, currency: Currency, year: i32, month: u32) -> Option<&RateEntry> {
        let key = RateKey {
            code: currency,
            year,
            month,
        };
        self.rates.get(&key)
    }

    /// Look up a rate for a specific day, preferring the Daily table (with
    /// weekend carry-back to the preceding Friday) and falling back to the
    /// Monthly table keyed by the day's calendar month.
    pub fn get_daily(&self, currency: Currency, date: NaiveDate) -> Option<Decimal> {
        let carried = carry_back_weekend(date);
        if let Some(rate) = self.daily.get(&DailyRateKey {
            code: currency,
            date: carried,
        }) {
            return Some(*rate);
        }
        self.get(currency, date.year(), date.month())
            .map(|entry| entry.rate_per_gbp)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Check whether any rate exists for the given currency code across all cached periods.
    pub fn has_currency(&self, code: &str) -> bool {
        let code = code.trim().to_uppercase();
        let Some(currency) = Currency::from_code(&code) else {
            return false;
        };
        self.rates.keys().any(|k| k.code == currency)
    }
}
