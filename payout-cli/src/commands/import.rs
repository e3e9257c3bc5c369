//! Import command - read a settlement report and merge it into the catalog

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rust_decimal::Decimal;

use super::get_context;
use crate::output;
use payout_core::adapters::duckdb::BatchRecord;
use payout_core::{CatalogStore, ImportReport, SourceKind};

const PREVIEW_ROWS: usize = 10;
const ERROR_ROWS: usize = 20;

pub struct ImportArgs {
    pub file: PathBuf,
    pub kind: Option<SourceKind>,
    pub default_cost: Option<Decimal>,
    pub settlement_per_item: Option<Decimal>,
    pub preview: bool,
    pub force: bool,
    pub json: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let kind = match args.kind {
        Some(kind) => kind,
        None => args
            .file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SourceKind::from_extension)
            .with_context(|| {
                format!(
                    "Cannot tell the source kind of {}; pass --kind tabular-text|spreadsheet|unstructured-text",
                    args.file.display()
                )
            })?,
    };

    let bytes = std::fs::read(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
    let ctx = get_context()?;

    let mut config = ctx.config.import.clone();
    if let Some(cost) = args.default_cost {
        config.default_unit_cost = cost;
    }
    if let Some(spi) = args.settlement_per_item {
        config = config.with_settlement_per_item(spi);
    }

    let existing = ctx.catalog.list_products()?;
    let report = ctx.import_service.import_file(&bytes, kind, &existing, &config);

    if !report.is_success() {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            output::error("Import failed:");
            output::print_errors(&report.errors, ERROR_ROWS);
        }
        bail!("No transactions imported from {}", args.file.display());
    }

    if !args.preview && !args.force {
        if let Some(previous) = ctx.catalog.find_batch_by_checksum(&report.checksum)? {
            bail!(
                "This file was already imported as {} ({} transactions); use --force to import it again",
                previous.batch_id,
                previous.new_transactions
            );
        }
    }

    if !args.preview {
        let batch = BatchRecord {
            batch_id: report.batch_id.clone(),
            source_kind: kind.to_string(),
            source_format: report.format.map(|f| f.as_str().to_string()),
            file_name: args.file.file_name().map(|n| n.to_string_lossy().into_owned()),
            checksum: report.checksum.clone(),
            new_products: report.stats.new_products as i64,
            new_transactions: report.stats.new_transactions as i64,
            imported_at: None,
        };
        ctx.catalog
            .persist_import(&report.products, &report.transactions, &batch)
            .context("Failed to save import")?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, args.preview);
    Ok(())
}

fn print_report(report: &ImportReport, preview: bool) {
    if preview {
        println!("{}", "PREVIEW MODE - No changes applied".yellow());
        println!();
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Product", "Qty", "Sell", "Profit", "Notes"]);
    for tx in report.transactions.iter().take(PREVIEW_ROWS) {
        let notes = tx.notes.as_deref().unwrap_or("-").lines().next().unwrap_or("-").to_string();
        table.add_row(vec![
            comfy_table::Cell::new(tx.date.to_string()),
            comfy_table::Cell::new(&tx.product_name),
            comfy_table::Cell::new(tx.quantity),
            output::money_cell(tx.sell_price),
            output::money_cell(tx.profit),
            comfy_table::Cell::new(notes),
        ]);
    }
    println!("{}", table);
    if report.transactions.len() > PREVIEW_ROWS {
        println!("... and {} more", report.transactions.len() - PREVIEW_ROWS);
    }
    println!();

    let stats = &report.stats;
    let verb = if preview { "Would import" } else { "Imported" };
    output::success(&format!(
        "{} {} transactions ({} new products, {} returns)",
        verb, stats.new_transactions, stats.new_products, stats.returns
    ));
    println!("Estimated profit: {}", output::profit(stats.total_profit));
    if stats.inferred_quantities > 0 {
        output::info(&format!(
            "{} quantities estimated from settlement amounts",
            stats.inferred_quantities
        ));
    }
    println!("Batch: {}", report.batch_id.dimmed());

    let row_errors: Vec<String> = report
        .errors
        .iter()
        .filter(|e| e.starts_with("Row "))
        .cloned()
        .collect();
    if !row_errors.is_empty() {
        println!();
        output::warning(&format!("{} rows with problems:", row_errors.len()));
        output::print_errors(&row_errors, ERROR_ROWS);
    }
}
