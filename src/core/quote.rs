//! Quote provider abstraction and the records it returns

use super::errors::{FetchError, QuoteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the instrument's display name, when the provider sends one.
pub const SHORT_NAME_FIELD: &str = "shortName";

/// Suffix of the synthetic symbol quoting an exchange rate.
pub const FX_SUFFIX: &str = "=X";

/// Raw provider response: field name to value. Only the price field (and
/// optionally the short name) is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteRecord(Map<String, Value>);

impl QuoteRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Reads the required numeric price field.
    pub fn price(&self, symbol: &str, field: &str) -> Result<f64, QuoteError> {
        self.0
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| QuoteError::MissingPriceField {
                symbol: symbol.to_string(),
                field: field.to_string(),
            })
    }

    pub fn short_name(&self) -> Option<String> {
        self.0
            .get(SHORT_NAME_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QuoteRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Result of one completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    pub short_name: Option<String>,
}

/// The external data source. Implementations perform a single attempt; the
/// quote cache owns retries.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<QuoteRecord, FetchError>;
}

/// Symbol quoting the rate from `from` to `to`, e.g. `USDCHF=X`.
pub fn fx_symbol(from: &str, to: &str) -> String {
    format!("{from}{to}{FX_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_extraction() {
        let record: QuoteRecord = [
            ("regularMarketPrice", json!(150.25)),
            ("shortName", json!("Apple Inc.")),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.price("AAPL", "regularMarketPrice"), Ok(150.25));
        assert_eq!(record.short_name(), Some("Apple Inc.".to_string()));
    }

    #[test]
    fn test_missing_or_non_numeric_price() {
        let record: QuoteRecord = [("regularMarketPrice", json!("n/a"))].into_iter().collect();
        assert_eq!(
            record.price("AAPL", "regularMarketPrice"),
            Err(QuoteError::MissingPriceField {
                symbol: "AAPL".to_string(),
                field: "regularMarketPrice".to_string(),
            })
        );
        assert!(record.price("AAPL", "regularMarketOpen").is_err());
        assert_eq!(record.short_name(), None);
    }

    #[test]
    fn test_integer_prices_are_numeric() {
        let record: QuoteRecord = [("regularMarketPrice", json!(3))].into_iter().collect();
        assert_eq!(record.price("X", "regularMarketPrice"), Ok(3.0));
    }

    #[test]
    fn test_fx_symbol() {
        assert_eq!(fx_symbol("USD", "CHF"), "USDCHF=X");
    }

    #[test]
    fn test_record_deserializes_from_object() {
        let record: QuoteRecord =
            serde_json::from_str(r#"{"regularMarketPrice": 1.1, "currency": "EUR"}"#).unwrap();
        assert_eq!(record.get("currency"), Some(&json!("EUR")));
    }
}
