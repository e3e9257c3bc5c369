//! CLI command implementations

pub mod delete;
pub mod import;
pub mod products;
pub mod stats;
pub mod transactions;

use anyhow::{Context, Result};
use payout_core::config::payout_dir;
use payout_core::PayoutContext;

/// Open the payout context in `PAYOUT_DIR` or `~/.payout`
pub fn get_context() -> Result<PayoutContext> {
    let dir = payout_dir().context("Could not find home directory; set PAYOUT_DIR")?;
    PayoutContext::new(&dir).context("Failed to initialize payout context")
}
