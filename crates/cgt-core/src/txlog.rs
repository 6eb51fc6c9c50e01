//! Per-(date, symbol) aggregation of acquisitions, disposals, and the
//! in-flight B&B consumption ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One `(date, symbol)` entry's accumulated quantity, GBP amount, GBP fees,
/// and any ERI events attached to that day for that symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntry {
    pub quantity: Decimal,
    pub amount_gbp: Decimal,
    pub fees_gbp: Decimal,
    pub eris: Vec<EriEvent>,
}

/// `(date, symbol, amount_per_share_gbp)`. At most one per `(date, symbol)`;
/// re-adding the same key overwrites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EriEvent {
    pub date: NaiveDate,
    pub amount_per_share: Decimal,
}

pub type LogKey = (NaiveDate, String);

/// A single `(date, symbol) -> LogEntry` table with additive insert semantics.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: HashMap<LogKey, LogEntry>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate quantity/amount/fees into the `(date, symbol)` entry,
    /// concatenating any attached ERI events.
    pub fn append(
        &mut self,
        date: NaiveDate,
        symbol: &str,
        qty: Decimal,
        amount_gbp: Decimal,
        fees_gbp: Decimal,
        eris: &[EriEvent],
    ) {
        let entry = self
            .entries
            .entry((date, symbol.to_string()))
            .or_default();
        entry.quantity += qty;
        entry.amount_gbp += amount_gbp;
        entry.fees_gbp += fees_gbp;
        entry.eris.extend_from_slice(eris);
    }

    /// Returns the entry for `(date, symbol)`, or a zero-valued default if absent.
    pub fn get(&self, date: NaiveDate, symbol: &str) -> LogEntry {
        self.entries
            .get(&(date, symbol.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn has(&self, date: NaiveDate, symbol: &str) -> bool {
        self.entries.contains_key(&(date, symbol.to_string()))
    }

    /// Take up to `qty` shares' worth of quantity/amount/fees out of the
    /// `(date, symbol)` entry, proportionally, so a later match against the
    /// same acquisition day can't reuse shares an earlier match already
    /// claimed. Returns the consumed slice; a zero-quantity result means
    /// nothing was available.
    pub fn consume(&mut self, date: NaiveDate, symbol: &str, qty: Decimal) -> LogEntry {
        let key = (date, symbol.to_string());
        let Some(entry) = self.entries.get_mut(&key) else {
            return LogEntry::default();
        };
        if entry.quantity <= Decimal::ZERO || qty <= Decimal::ZERO {
            return LogEntry::default();
        }

        let taken = qty.min(entry.quantity);
        let fraction = taken / entry.quantity;
        let amount_taken = entry.amount_gbp * fraction;
        let fees_taken = entry.fees_gbp * fraction;

        entry.quantity -= taken;
        entry.amount_gbp -= amount_taken;
        entry.fees_gbp -= fees_taken;
        if entry.quantity <= Decimal::ZERO {
            self.entries.remove(&key);
        }

        LogEntry {
            quantity: taken,
            amount_gbp: amount_taken,
            fees_gbp: fees_taken,
            eris: Vec::new(),
        }
    }

    /// All `(date, symbol)` keys present, for the day-driver's active-day walk.
    pub fn keys(&self) -> impl Iterator<Item = &LogKey> {
        self.entries.keys()
    }
}
