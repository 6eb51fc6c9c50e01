use thiserror::Error;

/// Errors raised while ingesting transactions or running the calculation engine.
#[derive(Error, Debug)]
pub enum CgtError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("transaction missing required field '{field}' for action {action}")]
    MissingField { action: String, field: &'static str },

    #[error("non-positive quantity {quantity} for {action} on {symbol}")]
    NonPositiveQuantity {
        action: String,
        symbol: String,
        quantity: rust_decimal::Decimal,
    },

    #[error("amount {amount} is inconsistent with price {price} x quantity {quantity} for {symbol}")]
    AmountPriceMismatch {
        symbol: String,
        amount: rust_decimal::Decimal,
        price: rust_decimal::Decimal,
        quantity: rust_decimal::Decimal,
    },

    #[error("missing FX rate for {currency} on {date}")]
    RateMissing {
        currency: String,
        date: chrono::NaiveDate,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid tax year: {0} is out of valid range (1900-2100)")]
    InvalidTaxYear(u16),

    #[error("unsupported tax year {0} for CGT exemption lookup - please update the tool")]
    UnsupportedExemptionYear(u16),
}

impl From<cgt_money::FxConversionError> for CgtError {
    fn from(err: cgt_money::FxConversionError) -> Self {
        let cgt_money::FxConversionError::MissingRate {
            currency,
            year,
            month,
        } = err;
        let date = chrono::NaiveDate::from_ymd_opt(year, month, 1)
            .unwrap_or_else(|| chrono::NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch"));
        CgtError::RateMissing { currency, date }
    }
}
