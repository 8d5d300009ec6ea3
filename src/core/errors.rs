//! Error types for the quote engine and the optional-value algebra.

use thiserror::Error;

/// Misuse of [`OptionalValue`](super::optional::OptionalValue) or
/// [`Money`](super::money::Money). These are caller bugs and are never
/// turned into an absent value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    /// `get()` was called on a value that is not known yet.
    #[error("Attempted to unwrap an absent value")]
    AbsentValueUnwrap,

    /// Two amounts in different currencies were combined.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// Ordering is undefined when either operand is absent.
    #[error("Cannot order an absent value")]
    UnorderedAbsent,
}

/// Failure reported by a [`QuoteFetcher`](super::quote::QuoteFetcher).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("Transport error for {symbol}: {message}")]
    Transport { symbol: String, message: String },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP error: {status} for symbol: {symbol}")]
    Status { symbol: String, status: u16 },

    /// The provider does not know the symbol.
    #[error("Symbol not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("Malformed response for {symbol}: {message}")]
    Malformed { symbol: String, message: String },

    /// The response decoded but carried no quote.
    #[error("No quote data found for symbol: {0}")]
    NoData(String),
}

impl FetchError {
    /// Whether another attempt may succeed. Only transport-level failures,
    /// server errors and rate limiting qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::NotFound(_) | Self::Malformed { .. } | Self::NoData(_) => false,
        }
    }
}

/// Errors surfaced by the quote cache to callers that wait on a refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The provider answered but the record lacks the configured price field.
    #[error("Quote for {symbol} has no numeric '{field}' field")]
    MissingPriceField { symbol: String, field: String },

    /// The symbol is not tracked by the cache or the holdings book.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// The refresh task was dropped before it reported back, e.g. because the
    /// runtime shut down.
    #[error("Refresh for {0} was aborted")]
    Aborted(String),
}

/// Problems with the configured accounts and positions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HoldingsError {
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Account with name exists: {0}")]
    DuplicateAccount(String),

    #[error("Symbol exists: {0}")]
    DuplicateSymbol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        let error = FetchError::Transport {
            symbol: "AAPL".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(error.is_transient());
    }

    #[test]
    fn test_status_classification() {
        let status = |status| FetchError::Status {
            symbol: "AAPL".to_string(),
            status,
        };
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
    }

    #[test]
    fn test_data_shape_errors_are_fatal() {
        assert!(!FetchError::NotFound("NOPE".to_string()).is_transient());
        assert!(!FetchError::NoData("NOPE".to_string()).is_transient());
        assert!(
            !FetchError::Malformed {
                symbol: "NOPE".to_string(),
                message: "expected value".to_string(),
            }
            .is_transient()
        );
    }

    #[test]
    fn test_error_messages() {
        let error = QuoteError::MissingPriceField {
            symbol: "AAPL".to_string(),
            field: "regularMarketPrice".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Quote for AAPL has no numeric 'regularMarketPrice' field"
        );

        let error: QuoteError = FetchError::Status {
            symbol: "USDEUR=X".to_string(),
            status: 500,
        }
        .into();
        assert_eq!(error.to_string(), "HTTP error: 500 for symbol: USDEUR=X");
    }
}
