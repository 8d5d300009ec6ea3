//! Quote engine, value algebra and holdings

pub mod config;
pub mod errors;
pub mod holdings;
pub mod log;
pub mod money;
pub mod observers;
pub mod optional;
pub mod quote;
pub mod quote_cache;
pub mod retry;

pub use errors::{AlgebraError, FetchError, HoldingsError, QuoteError};
pub use holdings::{Account, Book, Position};
pub use money::{Money, SignStyle};
pub use optional::OptionalValue;
pub use quote::{QuoteFetcher, QuoteRecord, QuoteSnapshot};
pub use quote_cache::{QuoteCache, QuoteState, QuoteUpdate, RefreshHandle, RefreshPolicy};
