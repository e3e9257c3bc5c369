//! Transactions command - list the ledger

use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;

use super::get_context;
use crate::output;
use payout_core::Platform;

pub fn run(date: Option<NaiveDate>, platform: Platform, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let transactions = ctx.stats_service.transactions(platform, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        output::info("No transactions match.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Product", "Qty", "Buy", "Sell", "Profit", "Notes"]);
    for tx in &transactions {
        table.add_row(vec![
            Cell::new(tx.date.to_string()),
            Cell::new(&tx.product_name),
            Cell::new(tx.quantity),
            output::money_cell(tx.buy_price),
            output::money_cell(tx.sell_price),
            output::money_cell(tx.profit),
            Cell::new(tx.notes.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{}", table);

    let total: Decimal = transactions.iter().map(|t| t.profit).sum();
    println!("{} transactions, profit {}", transactions.len(), output::profit(total));
    Ok(())
}
