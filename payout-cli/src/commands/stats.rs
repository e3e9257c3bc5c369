//! Stats command - profit summary and top products

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use super::get_context;
use crate::output;
use payout_core::Platform;

pub fn run(platform: Platform, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let stats = ctx.stats_service.dashboard(platform)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let title = match platform {
        Platform::All => "Profit Summary",
        Platform::Shopee => "Profit Summary (Shopee)",
        Platform::TikTok => "Profit Summary (TikTok Shop)",
    };
    println!("{}", title.bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec![Cell::new("Today"), output::money_cell(stats.today_profit)]);
    table.add_row(vec![Cell::new("Last 7 days"), output::money_cell(stats.week_profit)]);
    table.add_row(vec![Cell::new("This month"), output::money_cell(stats.month_profit)]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(stats.total_transactions)]);
    println!("{}", table);

    if !stats.top_products.is_empty() {
        println!();
        println!("{}", "Top Products".bold());
        let mut top = output::create_table();
        top.set_header(vec!["#", "Product", "Qty", "Profit"]);
        for (i, p) in stats.top_products.iter().enumerate() {
            top.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&p.product_name),
                Cell::new(p.total_quantity),
                output::money_cell(p.total_profit),
            ]);
        }
        println!("{}", top);
    }
    Ok(())
}
