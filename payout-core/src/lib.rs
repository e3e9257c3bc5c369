//! Payout Core - settlement report ingestion for marketplace sellers
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Core entities (Product, Transaction, NormalizedEntry)
//! - **ports**: Trait definitions for external dependencies (CatalogStore, TextExtractor)
//! - **services**: Import pipeline, ledger statistics, migrations
//! - **adapters**: Concrete implementations (DuckDB, in-memory, PDF)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbCatalog;
use adapters::pdf::PdfTextExtractor;
use config::Config;
use services::{ImportService, StatsService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{NormalizedEntry, Product, SourceFormat, SourceKind, Transaction};
pub use ports::{CatalogStore, TextExtractor};
pub use services::{ImportReport, ImportStage, ImportStats, Platform};

const DB_FILENAME: &str = "payout.duckdb";

/// Main context for payout operations
///
/// Holds the configuration, the catalog database and the services built on it.
pub struct PayoutContext {
    pub config: Config,
    pub catalog: Arc<DuckDbCatalog>,
    pub import_service: ImportService,
    pub stats_service: StatsService,
}

impl PayoutContext {
    /// Open the context rooted at a payout directory, creating it if needed
    pub fn new(payout_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(payout_dir)
            .with_context(|| format!("Failed to create {}", payout_dir.display()))?;
        let config = Config::load(payout_dir)?;

        let catalog = Arc::new(DuckDbCatalog::open(&payout_dir.join(DB_FILENAME))?);
        let import_service = ImportService::new(Arc::new(PdfTextExtractor));
        let stats_service = StatsService::new(catalog.clone());

        Ok(Self {
            config,
            catalog,
            import_service,
            stats_service,
        })
    }
}
