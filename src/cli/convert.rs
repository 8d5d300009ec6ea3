use crate::core::money::Money;
use crate::core::quote::fx_symbol;
use crate::core::quote_cache::QuoteCache;
use anyhow::{Context, Result};

/// Converts `amount` with a freshly fetched exchange rate.
pub async fn convert(cache: &QuoteCache, amount: f64, from: &str, to: &str) -> Result<Money> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    if from != to {
        let symbol = fx_symbol(&from, &to);
        cache
            .force_refresh(&symbol)
            .await
            .with_context(|| format!("Failed to fetch exchange rate {symbol}"))?;
    }
    Ok(cache.convert(&Money::new(amount, from), &to))
}

pub async fn run(cache: &QuoteCache, amount: f64, from: &str, to: &str) -> Result<()> {
    let converted = convert(cache, amount, from, to).await?;
    println!("{} = {}", Money::new(amount, from.to_uppercase()), converted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::FetchError;
    use crate::core::quote::{QuoteFetcher, QuoteRecord};
    use crate::core::quote_cache::{DEFAULT_PRICE_FIELD, RefreshPolicy};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    struct RateFetcher;

    #[async_trait]
    impl QuoteFetcher for RateFetcher {
        async fn fetch(&self, symbol: &str) -> Result<QuoteRecord, FetchError> {
            match symbol {
                "USDCHF=X" => Ok([(DEFAULT_PRICE_FIELD, json!(0.9))].into_iter().collect()),
                _ => Err(FetchError::NotFound(symbol.to_string())),
            }
        }
    }

    fn cache() -> QuoteCache {
        QuoteCache::new(Arc::new(RateFetcher), RefreshPolicy::default(), Handle::current())
    }

    #[tokio::test]
    async fn test_convert_fetches_rate_first() {
        let cache = cache();
        let converted = convert(&cache, 100.0, "usd", "chf").await.unwrap();
        assert_eq!(converted.currency(), "CHF");
        assert!((converted.get().unwrap() - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_same_currency_needs_no_rate() {
        let cache = cache();
        let converted = convert(&cache, 42.0, "EUR", "EUR").await.unwrap();
        assert_eq!(converted, Money::new(42.0, "EUR"));
        assert!(cache.tracked_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_pair_fails() {
        let cache = cache();
        let error = convert(&cache, 1.0, "XXX", "CHF").await.unwrap_err();
        assert!(error.to_string().contains("XXXCHF=X"));
    }
}
