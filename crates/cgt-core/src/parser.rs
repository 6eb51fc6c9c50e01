//! Reads the broker-native transaction feed off disk.
//!
//! The wire format is a JSON array of [`RawTransaction`]; the heavy lifting
//! (action dispatch, currency code lookup, symbol upper-casing) lives in
//! `RawTransaction`'s own `Deserialize` impl. This module is the thin
//! "load it from a file" adapter `cgt-cli` calls.

use std::path::Path;

use crate::error::CgtError;
use crate::models::RawTransaction;

/// Parse a JSON array of transactions from a string.
pub fn parse_str(input: &str) -> Result<Vec<RawTransaction>, CgtError> {
    serde_json::from_str(input).map_err(CgtError::SerializationError)
}

/// Read and parse a transaction file from disk.
pub fn parse_file(path: &Path) -> Result<Vec<RawTransaction>, CgtError> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAction;

    #[test]
    fn parses_a_minimal_buy() {
        let json = r#"[{"date":"2024-05-01","action":"BUY","symbol":"aapl","quantity":100,"price":150,"amount":-15010,"fees":10,"currency":"GBP","broker":"test"}]"#;
        let txs = parse_str(json).expect("valid feed");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].action, RawAction::Buy);
        assert_eq!(txs[0].symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = parse_str("not json");
        assert!(matches!(result, Err(CgtError::SerializationError(_))));
    }

    #[test]
    fn parses_an_empty_feed() {
        let txs = parse_str("[]").expect("empty feed is valid");
        assert!(txs.is_empty());
    }
}
