use crate::core::money::{Money, SignStyle};
use crate::core::optional::OptionalValue;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

const PROGRESS_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}";

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Red for losses, green otherwise, grey while the value is unknown.
pub fn sign_color(sign: SignStyle) -> Color {
    match sign {
        SignStyle::Negative => Color::Red,
        SignStyle::NonNegative => Color::Green,
        SignStyle::Absent => Color::DarkGrey,
    }
}

/// Right-aligned amount, colored by sign.
pub fn money_cell(amount: &Money) -> Cell {
    Cell::new(amount.to_string())
        .fg(sign_color(amount.sign_style()))
        .set_alignment(CellAlignment::Right)
}

/// Right-aligned plain number. Absent values show the placeholder in grey.
pub fn optional_cell(value: OptionalValue, format_fn: impl Fn(f64) -> String) -> Cell {
    match value.value() {
        Some(v) => Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
        None => Cell::new("?")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
    }
}

/// Styles a total line according to the sign of `amount`.
pub fn style_total(amount: &Money) -> String {
    let style_type = match amount.sign_style() {
        SignStyle::NonNegative => StyleType::TotalValue,
        SignStyle::Negative => StyleType::Error,
        SignStyle::Absent => StyleType::Subtle,
    };
    style_text(&amount.to_string(), style_type)
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let bar_style = ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(bar_style);
    pb
}
