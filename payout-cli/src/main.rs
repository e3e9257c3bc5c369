//! Payout CLI - marketplace settlement ledger in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{delete, import, products, stats, transactions};
use payout_core::{Platform, SourceKind};

/// Payout - import TikTok Shop and Shopee settlement reports
#[derive(Parser)]
#[command(name = "payout", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a settlement report (CSV, spreadsheet or PDF statement)
    Import {
        /// Path to the report file
        file: PathBuf,
        /// Source kind (tabular-text, spreadsheet, unstructured-text); guessed from the extension if omitted
        #[arg(long)]
        kind: Option<SourceKind>,
        /// Buy price for products first seen without a unit cost
        #[arg(long)]
        default_cost: Option<Decimal>,
        /// Expected payout per unit, used to estimate quantities
        #[arg(long)]
        settlement_per_item: Option<Decimal>,
        /// Show what would be imported without saving
        #[arg(long)]
        preview: bool,
        /// Import even if the same file was imported before
        #[arg(long)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List products in the catalog
    Products {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions, newest first
    Transactions {
        /// Only transactions on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
        /// Marketplace filter (all, shopee, tiktok)
        #[arg(long, default_value = "all")]
        platform: Platform,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show profit summary and top products
    Stats {
        /// Marketplace filter (all, shopee, tiktok)
        #[arg(long, default_value = "all")]
        platform: Platform,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a product or transaction
    Delete {
        #[command(subcommand)]
        command: delete::DeleteCommands,
    },
}

/// Log to stderr, filtered by `PAYOUT_LOG` (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAYOUT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            file,
            kind,
            default_cost,
            settlement_per_item,
            preview,
            force,
            json,
        } => import::run(import::ImportArgs {
            file,
            kind,
            default_cost,
            settlement_per_item,
            preview,
            force,
            json,
        }),
        Commands::Products { json } => products::run(json),
        Commands::Transactions { date, platform, json } => transactions::run(date, platform, json),
        Commands::Stats { platform, json } => stats::run(platform, json),
        Commands::Delete { command } => delete::run(command),
    }
}
