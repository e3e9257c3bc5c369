//! Products command - list the catalog

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use super::get_context;
use crate::output;
use payout_core::CatalogStore;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut products = ctx.catalog.list_products()?;
    products.sort_by_key(|p| p.key());

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if products.is_empty() {
        println!("No products yet. Import a settlement report with {}.", "payout import <file>".bold());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Category", "Buy", "Sell", "Margin", "ID"]);
    for p in &products {
        table.add_row(vec![
            Cell::new(&p.name),
            Cell::new(p.category.as_deref().unwrap_or("-")),
            output::money_cell(p.buy_price),
            output::money_cell(p.sell_price),
            output::money_cell(p.unit_margin()),
            Cell::new(p.id.to_string()),
        ]);
    }
    println!("{}", table);
    println!("{} products", products.len());
    Ok(())
}
