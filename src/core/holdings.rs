//! Accounts and share positions, valued through the quote cache.

use crate::core::config::{AccountConfig, AppConfig, PositionConfig, TransactionConfig};
use crate::core::errors::{AlgebraError, HoldingsError, QuoteError};
use crate::core::money::Money;
use crate::core::quote::fx_symbol;
use crate::core::quote_cache::QuoteCache;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// A cash account whose balance is the running sum of its transactions.
#[derive(Debug)]
pub struct Account {
    pub name: String,
    pub currency: String,
    pub category: u32,
    transactions: Vec<TransactionConfig>,
    balance: OnceLock<f64>,
    previous_balance: OnceLock<f64>,
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        currency: impl Into<String>,
        category: u32,
        transactions: Vec<TransactionConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            currency: currency.into(),
            category,
            transactions,
            balance: OnceLock::new(),
            previous_balance: OnceLock::new(),
        }
    }

    fn from_config(config: &AccountConfig, default_currency: &str) -> Self {
        Self::new(
            config.name.clone(),
            config.currency.as_deref().unwrap_or(default_currency),
            config.category,
            config.transactions.clone(),
        )
    }

    pub fn balance(&self) -> Money {
        let balance = *self
            .balance
            .get_or_init(|| self.transactions.iter().map(|t| t.value).sum());
        Money::new(balance, self.currency.as_str())
    }

    /// Balance before the most recent transaction.
    pub fn previous_balance(&self) -> Money {
        let previous = *self.previous_balance.get_or_init(|| {
            let count = self.transactions.len().saturating_sub(1);
            self.transactions[..count].iter().map(|t| t.value).sum()
        });
        Money::new(previous, self.currency.as_str())
    }

    pub fn diff_to_last(&self) -> Money {
        let diff = self.balance().value() - self.previous_balance().value();
        Money::new(diff, self.currency.as_str())
    }
}

/// Shares held in one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub currency: String,
    pub quantity: f64,
    pub proceeds: f64,
}

impl From<&PositionConfig> for Position {
    fn from(config: &PositionConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            currency: config.currency.clone(),
            quantity: config.quantity,
            proceeds: config.proceeds,
        }
    }
}

impl Position {
    pub fn price(&self, cache: &QuoteCache) -> Money {
        Money::new(cache.get_current_value(&self.symbol), self.currency.as_str())
    }

    /// Market value, in the position currency or converted to `currency`.
    pub fn current_total_value(&self, cache: &QuoteCache, currency: Option<&str>) -> Money {
        let native = self.price(cache) * self.quantity;
        match currency {
            Some(to) => cache.convert(&native, to),
            None => native,
        }
    }

    /// Market value plus the net proceeds of all trades.
    pub fn current_total_gain(&self, cache: &QuoteCache, currency: Option<&str>) -> Money {
        let native = self.current_total_value(cache, None) + self.proceeds;
        match currency {
            Some(to) => cache.convert(&native, to),
            None => native,
        }
    }
}

/// Everything the user holds.
#[derive(Debug, Default)]
pub struct Book {
    accounts: Vec<Account>,
    positions: Vec<Position>,
}

impl Book {
    pub fn new(accounts: Vec<Account>, positions: Vec<Position>) -> Result<Self, HoldingsError> {
        let mut names = BTreeSet::new();
        for account in &accounts {
            if !names.insert(account.name.as_str()) {
                return Err(HoldingsError::DuplicateAccount(account.name.clone()));
            }
        }
        let mut symbols = BTreeSet::new();
        for position in &positions {
            if !symbols.insert(position.symbol.as_str()) {
                return Err(HoldingsError::DuplicateSymbol(position.symbol.clone()));
            }
        }
        Ok(Self {
            accounts,
            positions,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, HoldingsError> {
        let accounts = config
            .accounts
            .iter()
            .map(|a| Account::from_config(a, &config.currency))
            .collect();
        let positions = config.positions.iter().map(Position::from).collect();
        Self::new(accounts, positions)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn accounts_in(&self, category: u32) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(move |a| a.category == category)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn account(&self, name: &str) -> Result<&Account, HoldingsError> {
        self.accounts
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| HoldingsError::UnknownAccount(name.to_string()))
    }

    pub fn position(&self, symbol: &str) -> Result<&Position, QuoteError> {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol)
            .ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))
    }

    /// Position symbols plus the exchange-rate symbols needed to express
    /// everything in `currency`, sorted and deduplicated.
    pub fn required_symbols(&self, currency: &str) -> Vec<String> {
        let foreign = self
            .accounts
            .iter()
            .map(|a| a.currency.as_str())
            .chain(self.positions.iter().map(|p| p.currency.as_str()))
            .filter(|c| *c != currency)
            .map(|c| fx_symbol(c, currency));
        self.positions
            .iter()
            .map(|p| p.symbol.clone())
            .chain(foreign)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn total_balance(&self, cache: &QuoteCache, currency: &str) -> Result<Money, AlgebraError> {
        let converted: Vec<Money> = self
            .accounts
            .iter()
            .map(|a| cache.convert(&a.balance(), currency))
            .collect();
        Money::try_sum(&converted, currency)
    }

    pub fn total_positions_value(
        &self,
        cache: &QuoteCache,
        currency: &str,
    ) -> Result<Money, AlgebraError> {
        let converted: Vec<Money> = self
            .positions
            .iter()
            .map(|p| p.current_total_value(cache, Some(currency)))
            .collect();
        Money::try_sum(&converted, currency)
    }

    pub fn net_worth(&self, cache: &QuoteCache, currency: &str) -> Result<Money, AlgebraError> {
        self.total_balance(cache, currency)?
            .try_add(&self.total_positions_value(cache, currency)?)
    }
}
