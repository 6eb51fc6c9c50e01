//! The ingestion contract: the wire/JSON shape the engine's `add_*` methods consume.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CgtError;

pub use cgt_money::{Currency, CurrencyAmount};

/// A validated UK tax year identifier (April 6 to April 5).
///
/// Stores the start year internally and serializes to "YYYY/YY" format (e.g., "2023/24").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaxPeriod(u16);

impl TaxPeriod {
    /// Create a new TaxPeriod from a start year.
    ///
    /// # Errors
    /// Returns `CgtError::InvalidTaxYear` if the year is outside the range 1900-2100.
    pub fn new(start_year: u16) -> Result<Self, CgtError> {
        if !(1900..=2100).contains(&start_year) {
            return Err(CgtError::InvalidTaxYear(start_year));
        }
        Ok(Self(start_year))
    }

    /// Derive the tax year from a date (6 April cutoff).
    pub fn from_date(date: NaiveDate) -> Self {
        Self(crate::calendar::tax_year_of(date) as u16)
    }

    pub fn start_year(&self) -> u16 {
        self.0
    }

    pub fn end_year(&self) -> u16 {
        self.0 + 1
    }

    pub fn start_date(&self) -> NaiveDate {
        crate::calendar::tax_year_start(self.0 as i32)
    }

    pub fn end_date(&self) -> NaiveDate {
        crate::calendar::tax_year_end(self.0 as i32)
    }
}

impl std::fmt::Display for TaxPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:02}", self.0, (self.0 + 1) % 100)
    }
}

impl Serialize for TaxPeriod {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaxPeriod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let (start_str, end_str) = s
            .split_once('/')
            .ok_or_else(|| serde::de::Error::custom(format!("invalid tax period: '{s}'")))?;
        let start: u16 = start_str
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid start year: '{start_str}'")))?;
        let end_short: u16 = end_str
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid end year: '{end_str}'")))?;
        let expected_end = (start + 1) % 100;
        if end_short != expected_end {
            return Err(serde::de::Error::custom(format!(
                "tax years must be consecutive: '{s}' should end with '{expected_end:02}'"
            )));
        }
        TaxPeriod::new(start).map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for TaxPeriod {
    fn schema_name() -> String {
        "TaxPeriod".to_owned()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        let mut schema = generator.subschema_for::<String>().into_object();
        schema.metadata().description =
            Some("UK tax year in 'YYYY/YY' format (e.g., '2023/24')".to_owned());
        schema.string().pattern = Some(r"^\d{4}/\d{2}$".to_owned());
        schema.into()
    }
}

/// The full action vocabulary a broker feed may emit.
///
/// The engine itself never string-compares an action: [`RawTransaction::classify`]
/// dispatches each action into one of five shapes the matching rules and
/// corporate-action handler actually understand (see [`crate::engine`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawAction {
    Buy,
    Sell,
    StockActivity,
    StockSplit,
    Dividend,
    DividendTax,
    Interest,
    Fee,
    Transfer,
    SpinOff,
    ExcessReportedIncome,
    CashMerger,
    FullRedemption,
    Adjustment,
    CapitalGain,
    ReinvestShares,
    ReinvestDividends,
    WireFundsReceived,
}

impl RawAction {
    fn from_str_ci(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Some(match upper.as_str() {
            "BUY" => Self::Buy,
            "SELL" => Self::Sell,
            "STOCK_ACTIVITY" | "STOCKACTIVITY" => Self::StockActivity,
            "STOCK_SPLIT" | "STOCKSPLIT" => Self::StockSplit,
            "DIVIDEND" => Self::Dividend,
            "DIVIDEND_TAX" | "DIVIDENDTAX" => Self::DividendTax,
            "INTEREST" => Self::Interest,
            "FEE" => Self::Fee,
            "TRANSFER" => Self::Transfer,
            "SPIN_OFF" | "SPINOFF" => Self::SpinOff,
            "EXCESS_REPORTED_INCOME" | "ERI" => Self::ExcessReportedIncome,
            "CASH_MERGER" | "CASHMERGER" => Self::CashMerger,
            "FULL_REDEMPTION" | "FULLREDEMPTION" => Self::FullRedemption,
            "ADJUSTMENT" => Self::Adjustment,
            "CAPITAL_GAIN" | "CAPITALGAIN" => Self::CapitalGain,
            "REINVEST_SHARES" | "REINVESTSHARES" => Self::ReinvestShares,
            "REINVEST_DIVIDENDS" | "REINVESTDIVIDENDS" => Self::ReinvestDividends,
            "WIRE_FUNDS_RECEIVED" | "WIREFUNDSRECEIVED" => Self::WireFundsReceived,
            _ => return None,
        })
    }

    /// The audit-log category prefix used for actions not covered by the
    /// matching rules (see [`crate::audit`]).
    pub fn category_key(&self) -> &'static str {
        match self {
            RawAction::Buy | RawAction::StockActivity | RawAction::StockSplit => "buy",
            RawAction::Sell => "sell",
            RawAction::Dividend | RawAction::DividendTax => "dividend",
            RawAction::Interest => "interest",
            RawAction::Fee => "fee",
            RawAction::Transfer => "transfer",
            RawAction::SpinOff => "spinoff",
            RawAction::ExcessReportedIncome => "eri",
            RawAction::CashMerger => "cash_merger",
            RawAction::FullRedemption => "full_redemption",
            RawAction::Adjustment => "adjustment",
            RawAction::CapitalGain => "capital_gain",
            RawAction::ReinvestShares => "reinvest_shares",
            RawAction::ReinvestDividends => "reinvest_dividends",
            RawAction::WireFundsReceived => "wire_funds_received",
        }
    }
}

/// A single broker-native transaction, as delivered by the ingestion adapter.
///
/// Sign convention on `amount` follows the broker: a Buy's `amount` is
/// `≤ 0` (cash outflow), a Sell's `amount` is `≥ 0` (cash inflow); the engine
/// re-derives the sign it actually needs internally.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub action: RawAction,
    pub symbol: Option<String>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub fees: Decimal,
    pub currency: Currency,
    pub broker: String,
    pub isin: Option<String>,
    pub description: Option<String>,
    /// New-shares-per-old-share multiplier for `StockSplit` only (e.g. `2`
    /// for a 2-for-1 split). Not part of the wire contract's general
    /// `quantity`/`price`/`amount` trio since a split has neither a price
    /// nor a cash amount; concretizes §4.10's "for StockSplit amount is
    /// zero" into a field the B&B walk's `split_multiplier` can consume.
    pub split_ratio: Option<Decimal>,
}

impl RawTransaction {
    /// The uppercased symbol, or an error if this action requires one and it's absent.
    pub fn required_symbol(&self) -> Result<String, CgtError> {
        self.symbol
            .clone()
            .map(|s| s.to_uppercase())
            .ok_or_else(|| CgtError::MissingField {
                action: format!("{:?}", self.action),
                field: "symbol",
            })
    }

    pub fn required_quantity(&self) -> Result<Decimal, CgtError> {
        self.quantity.ok_or_else(|| CgtError::MissingField {
            action: format!("{:?}", self.action),
            field: "quantity",
        })
    }

    pub fn required_amount(&self) -> Result<Decimal, CgtError> {
        self.amount.ok_or_else(|| CgtError::MissingField {
            action: format!("{:?}", self.action),
            field: "amount",
        })
    }
}

/// JSON wire shape for [`RawTransaction`], matched case-insensitively on `action`
/// the way the teacher's own transaction format does.
#[derive(Debug, Deserialize)]
struct WireTransaction {
    date: NaiveDate,
    action: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    quantity: Option<Decimal>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    fees: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    broker: String,
    #[serde(default)]
    isin: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    split_ratio: Option<Decimal>,
}

fn default_currency() -> String {
    "GBP".to_string()
}

impl<'de> Deserialize<'de> for RawTransaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = WireTransaction::deserialize(deserializer)?;
        let action = RawAction::from_str_ci(&wire.action).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognized action: '{}'", wire.action))
        })?;
        let currency = Currency::from_code(&wire.currency.trim().to_uppercase())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid currency code: '{}'", wire.currency)))?;

        Ok(RawTransaction {
            date: wire.date,
            action,
            symbol: wire.symbol.map(|s| s.to_uppercase()),
            quantity: wire.quantity,
            price: wire.price,
            amount: wire.amount,
            fees: wire.fees,
            currency,
            broker: wire.broker,
            isin: wire.isin,
            description: wire.description,
            split_ratio: wire.split_ratio,
        })
    }
}

/// Mirrors [`WireTransaction`]'s shape so a parsed feed can be echoed back
/// out the same shape it came in (`cgt-cli parse`).
impl Serialize for RawTransaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("RawTransaction", 12)?;
        state.serialize_field("date", &self.date)?;
        state.serialize_field("action", &self.action)?;
        state.serialize_field("symbol", &self.symbol)?;
        state.serialize_field("quantity", &self.quantity)?;
        state.serialize_field("price", &self.price)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("fees", &self.fees)?;
        state.serialize_field("currency", self.currency.code())?;
        state.serialize_field("broker", &self.broker)?;
        state.serialize_field("isin", &self.isin)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("split_ratio", &self.split_ratio)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_period_serialization_roundtrips() {
        let period = TaxPeriod::new(2023).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2023/24\"");
        let back: TaxPeriod = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_year(), 2023);
    }

    #[test]
    fn tax_period_rejects_non_consecutive_years() {
        let result: Result<TaxPeriod, _> = serde_json::from_str("\"2023/27\"");
        assert!(result.is_err());
    }

    #[test]
    fn wire_transaction_parses_case_insensitive_action() {
        let json = r#"{"date":"2024-05-01","action":"buy","symbol":"aapl","quantity":100,"price":150,"amount":-15010,"fees":10,"currency":"GBP","broker":"test"}"#;
        let tx: RawTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.action, RawAction::Buy);
        assert_eq!(tx.symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn wire_transaction_rejects_unknown_action() {
        let json = r#"{"date":"2024-05-01","action":"BOGUS","currency":"GBP"}"#;
        let result: Result<RawTransaction, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn raw_transaction_serializes_back_to_a_parseable_shape() {
        let json = r#"{"date":"2024-05-01","action":"BUY","symbol":"aapl","quantity":100,"price":150,"amount":-15010,"fees":10,"currency":"GBP","broker":"test"}"#;
        let tx: RawTransaction = serde_json::from_str(json).unwrap();
        let roundtripped = serde_json::to_string(&tx).unwrap();
        let back: RawTransaction = serde_json::from_str(&roundtripped).unwrap();
        assert_eq!(tx, back);
    }
}
