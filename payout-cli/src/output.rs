//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;

use payout_core::domain::format_rupiah;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned rupiah cell
pub fn money_cell(amount: Decimal) -> Cell {
    Cell::new(format_rupiah(amount)).set_alignment(CellAlignment::Right)
}

/// Rupiah amount colored by sign
pub fn profit(amount: Decimal) -> String {
    let text = format_rupiah(amount);
    if amount.is_sign_negative() && !amount.is_zero() {
        text.red().to_string()
    } else if amount.is_zero() {
        text.dimmed().to_string()
    } else {
        text.green().to_string()
    }
}

/// Print at most `limit` row errors, then a count of the rest
pub fn print_errors(errors: &[String], limit: usize) {
    for e in errors.iter().take(limit) {
        warning(&format!("  {}", e));
    }
    if errors.len() > limit {
        warning(&format!("  ... and {} more", errors.len() - limit));
    }
}
