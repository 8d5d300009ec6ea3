use super::ui;
use crate::core::holdings::Book;
use crate::core::quote::QuoteSnapshot;
use crate::core::quote_cache::QuoteCache;
use anyhow::{Context, Result};
use comfy_table::Cell;

pub fn render(snapshots: &[QuoteSnapshot]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Price"),
    ]);
    for snapshot in snapshots {
        table.add_row(vec![
            Cell::new(&snapshot.symbol),
            Cell::new(snapshot.short_name.as_deref().unwrap_or("")),
            ui::optional_cell(snapshot.price.into(), |p| format!("{p:.4}")),
        ]);
    }
    table.to_string()
}

/// Fetches every symbol the book needs, bypassing the cache TTL. Fails on
/// the first symbol the provider cannot quote.
pub async fn run(book: &Book, cache: &QuoteCache, currency: &str) -> Result<()> {
    let symbols = book.required_symbols(currency);
    let pb = ui::new_progress_bar(symbols.len() as u64);
    pb.set_message("Checking symbols...");
    let result = cache.check_symbols(&symbols).await;
    pb.finish_and_clear();

    let snapshots = result.context("Symbol check failed")?;
    println!("{}", render(&snapshots));
    println!(
        "\n{}",
        ui::style_text(
            &format!("All {} symbols resolved", snapshots.len()),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}
