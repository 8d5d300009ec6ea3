use super::ui;
use crate::core::holdings::Book;
use crate::core::quote_cache::QuoteCache;
use anyhow::Result;
use comfy_table::Cell;
use tracing::debug;

const PROGRESS_OBSERVER: &str = "summary-progress";

/// Requests every quote the book needs and waits until the cache has an
/// answer for each, ticking a progress bar as refreshes land.
pub async fn prefetch(book: &Book, cache: &QuoteCache, currency: &str) {
    let symbols = book.required_symbols(currency);
    let pb = ui::new_progress_bar(symbols.len() as u64);
    pb.set_message("Fetching quotes...");

    let pb_clone = pb.clone();
    cache.register_observer(PROGRESS_OBSERVER, move || pb_clone.inc(1));
    for symbol in &symbols {
        cache.get_current_value(symbol);
    }
    cache.settle().await;
    cache.remove_observer(PROGRESS_OBSERVER);
    pb.finish_and_clear();
    debug!("Prefetched {} symbols", symbols.len());
}

/// Renders accounts, positions and totals from whatever the cache holds.
/// Unknown prices render as placeholders.
pub fn render(book: &Book, cache: &QuoteCache, currency: &str) -> Result<String> {
    let mut accounts = ui::new_styled_table();
    accounts.set_header(vec![
        ui::header_cell("Account"),
        ui::header_cell("Category"),
        ui::header_cell("Balance"),
        ui::header_cell("Last change"),
        ui::header_cell(&format!("Balance ({currency})")),
    ]);
    for account in book.accounts() {
        let balance = account.balance();
        accounts.add_row(vec![
            Cell::new(&account.name),
            Cell::new(account.category),
            ui::money_cell(&balance),
            ui::money_cell(&account.diff_to_last()),
            ui::money_cell(&cache.convert(&balance, currency)),
        ]);
    }

    let mut positions = ui::new_styled_table();
    positions.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Quantity"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
        ui::header_cell("Gain"),
        ui::header_cell(&format!("Value ({currency})")),
    ]);
    for position in book.positions() {
        positions.add_row(vec![
            Cell::new(&position.symbol),
            ui::optional_cell(position.quantity.into(), |q| format!("{q:.2}")),
            ui::money_cell(&position.price(cache)),
            ui::money_cell(&position.current_total_value(cache, None)),
            ui::money_cell(&position.current_total_gain(cache, None)),
            ui::money_cell(&position.current_total_value(cache, Some(currency))),
        ]);
    }

    let balance = book.total_balance(cache, currency)?;
    let invested = book.total_positions_value(cache, currency)?;
    let net_worth = book.net_worth(cache, currency)?;

    let mut output = format!("{}\n\n", ui::style_text("Accounts", ui::StyleType::Title));
    output.push_str(&accounts.to_string());
    output.push_str(&format!(
        "\n\n{}\n\n",
        ui::style_text("Positions", ui::StyleType::Title)
    ));
    output.push_str(&positions.to_string());
    output.push_str(&format!(
        "\n\n{} {}\n{} {}\n{} {}",
        ui::style_text("Cash:", ui::StyleType::TotalLabel),
        ui::style_total(&balance),
        ui::style_text("Positions:", ui::StyleType::TotalLabel),
        ui::style_total(&invested),
        ui::style_text("Net worth:", ui::StyleType::TotalLabel),
        ui::style_total(&net_worth),
    ));
    Ok(output)
}

pub async fn run(book: &Book, cache: &QuoteCache, currency: &str) -> Result<()> {
    prefetch(book, cache, currency).await;
    println!("{}", render(book, cache, currency)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TransactionConfig;
    use crate::core::errors::FetchError;
    use crate::core::holdings::{Account, Position};
    use crate::core::quote::{QuoteFetcher, QuoteRecord};
    use crate::core::quote_cache::{DEFAULT_PRICE_FIELD, QuoteState, RefreshPolicy};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    struct FixedFetcher;

    #[async_trait]
    impl QuoteFetcher for FixedFetcher {
        async fn fetch(&self, symbol: &str) -> Result<QuoteRecord, FetchError> {
            match symbol {
                "AAPL" => Ok([(DEFAULT_PRICE_FIELD, json!(200.0))].into_iter().collect()),
                "EURUSD=X" => Ok([(DEFAULT_PRICE_FIELD, json!(1.1))].into_iter().collect()),
                _ => Err(FetchError::NotFound(symbol.to_string())),
            }
        }
    }

    fn book() -> Book {
        Book::new(
            vec![Account::new(
                "Girokonto",
                "EUR",
                0,
                vec![TransactionConfig {
                    date: None,
                    info: "Salary".to_string(),
                    value: 1000.0,
                }],
            )],
            vec![Position {
                symbol: "AAPL".to_string(),
                currency: "USD".to_string(),
                quantity: 2.0,
                proceeds: -300.0,
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_render_before_and_after_prefetch() {
        let cache = QuoteCache::new(
            Arc::new(FixedFetcher),
            RefreshPolicy::default(),
            Handle::current(),
        );
        let book = book();

        // Nothing fetched yet: values are placeholders, not errors.
        let pending = render(&book, &cache, "USD").unwrap();
        assert!(pending.contains("Girokonto"));
        assert!(pending.contains('?'));

        prefetch(&book, &cache, "USD").await;
        assert_eq!(cache.state("AAPL"), Ok(QuoteState::Fresh));
        assert_eq!(cache.state("EURUSD=X"), Ok(QuoteState::Fresh));

        let rendered = render(&book, &cache, "USD").unwrap();
        assert!(rendered.contains("USD 400.00"));
        assert!(rendered.contains("USD 100.00"));
        assert!(rendered.contains("USD 1,100.00"));
        assert!(rendered.contains("USD 1,500.00"));
    }
}
