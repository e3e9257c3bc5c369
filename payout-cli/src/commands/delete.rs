//! Delete command - remove a product or transaction

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use uuid::Uuid;

use super::get_context;
use crate::output;
use payout_core::CatalogStore;

#[derive(Subcommand)]
pub enum DeleteCommands {
    /// Delete a product (its transactions are kept)
    Product {
        /// Product ID
        id: String,
    },
    /// Delete a transaction
    Transaction {
        /// Transaction ID
        id: String,
    },
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("Invalid ID: {}", id))
}

pub fn run(command: DeleteCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        DeleteCommands::Product { id } => {
            let uuid = parse_id(&id)?;
            if !ctx.catalog.delete_product(uuid)? {
                bail!("Product not found: {}", id);
            }
            output::success(&format!("Deleted product {}", id));
        }
        DeleteCommands::Transaction { id } => {
            let uuid = parse_id(&id)?;
            if !ctx.catalog.delete_transaction(uuid)? {
                bail!("Transaction not found: {}", id);
            }
            output::success(&format!("Deleted transaction {}", id));
        }
    }
    Ok(())
}
