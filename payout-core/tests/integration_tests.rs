//! Integration tests for payout-core
//!
//! Import reports are persisted through real DuckDB files; PDF text comes
//! from a stub extractor.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use payout_core::adapters::duckdb::{BatchRecord, DuckDbCatalog};
use payout_core::adapters::memory::InMemoryCatalog;
use payout_core::config::ImportConfig;
use payout_core::services::stats::{dashboard_stats, filter_transactions};
use payout_core::services::ImportService;
use payout_core::{CatalogStore, Error, ImportReport, ImportStage, PayoutContext, Platform, Product, SourceKind, TextExtractor};

// ============================================================================
// Test Helpers
// ============================================================================

struct StubExtractor(String);

impl TextExtractor for StubExtractor {
    fn extract_text(&self, _bytes: &[u8]) -> Result<String, Error> {
        Ok(self.0.clone())
    }
}

fn service(statement_text: &str) -> ImportService {
    ImportService::new(Arc::new(StubExtractor(statement_text.to_string())))
}

fn create_test_catalog(temp_dir: &TempDir) -> DuckDbCatalog {
    DuckDbCatalog::open(&temp_dir.path().join("test.duckdb")).expect("Failed to open catalog")
}

fn processing_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 2).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// The merge flow callers run: list, import, upsert products, upsert transactions
fn import_and_persist(catalog: &dyn CatalogStore, service: &ImportService, bytes: &[u8], kind: SourceKind) -> ImportReport {
    let existing = catalog.list_products().unwrap();
    let report = service.import_file_on(bytes, kind, &existing, &ImportConfig::default(), processing_date());
    if report.is_success() {
        catalog.upsert_products(&report.products).unwrap();
        catalog.upsert_transactions(&report.transactions).unwrap();
    }
    report
}

const ORDERS_CSV: &str = "Order ID,Product Name,Variation,Quantity,SKU Unit Original Price,Order Amount,Created Time\n\
    \"ORD1\",\"Kaos Polos Hitam\",\"L\",\"2\",\"45000\",\"150000\",\"01/10/2025\"\n\
    \"ORD2\",\"Topi Rajut\",\"\",\"1\",\"\",\"35000\",\"02/10/2025\"\n\
    \"ORD3\",\"kaos polos hitam\",\"M\",\"1\",\"\",\"-75000\",\"03/10/2025\"\n";

const STATEMENT_TEXT: &str = "Shopee Laporan Mingguan\n\
    2025/10/20   196,250\n\
    2025/10/21   98,125\n\
    Total        294,375\n\
    2025/10/20   196,250\n";

// ============================================================================
// Import + Persist
// ============================================================================

#[test]
fn test_csv_import_persists_and_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let service = service("");

    {
        let catalog = create_test_catalog(&temp_dir);
        let report = import_and_persist(&catalog, &service, ORDERS_CSV.as_bytes(), SourceKind::TabularText);
        assert_eq!(report.stage, ImportStage::Done, "{:?}", report.errors);
        assert_eq!(report.stats.new_products, 2);
        assert_eq!(report.stats.new_transactions, 3);
        assert_eq!(report.stats.returns, 1);
    }

    let catalog = create_test_catalog(&temp_dir);
    let products = catalog.list_products().unwrap();
    assert_eq!(products.len(), 2);

    let kaos = products.iter().find(|p| p.name == "Kaos Polos Hitam").unwrap();
    assert_eq!(kaos.buy_price, dec("45000"));
    assert_eq!(kaos.sell_price, dec("75000"));
    assert_eq!(kaos.category.as_deref(), Some("TikTok Shop"));

    let topi = products.iter().find(|p| p.name == "Topi Rajut").unwrap();
    assert_eq!(topi.buy_price, dec("59000"));

    let transactions = catalog.list_transactions().unwrap();
    assert_eq!(transactions.len(), 3);
    // newest first
    assert_eq!(transactions[0].date, NaiveDate::from_ymd_opt(2025, 10, 3).unwrap());
    assert!(transactions[0].is_return());
    assert_eq!(transactions[0].profit, Decimal::ZERO);
    assert_eq!(transactions[0].product_id, kaos.id);

    let first = transactions.iter().find(|t| t.notes.as_deref() == Some("Order ID: ORD1 | L")).unwrap();
    // (75000 - 45000) * 2
    assert_eq!(first.profit, dec("60000"));
}

#[test]
fn test_reimport_reuses_products_and_appends_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = create_test_catalog(&temp_dir);
    let service = service("");

    let first = import_and_persist(&catalog, &service, ORDERS_CSV.as_bytes(), SourceKind::TabularText);
    let second = import_and_persist(&catalog, &service, ORDERS_CSV.as_bytes(), SourceKind::TabularText);

    assert_eq!(first.checksum, second.checksum);
    assert_eq!(second.stats.new_products, 0);
    assert_eq!(catalog.list_products().unwrap().len(), 2);
    assert_eq!(catalog.list_transactions().unwrap().len(), 6);
}

#[test]
fn test_statement_import_and_platform_stats() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = create_test_catalog(&temp_dir);

    import_and_persist(&catalog, &service(""), ORDERS_CSV.as_bytes(), SourceKind::TabularText);
    let report = import_and_persist(&catalog, &service(STATEMENT_TEXT), b"%PDF-1.7", SourceKind::UnstructuredText);

    assert_eq!(report.stage, ImportStage::Done);
    // duplicate page line collapsed, total line has no date
    assert_eq!(report.transactions.len(), 2);
    assert_eq!(report.stats.inferred_quantities, 2);

    let all = catalog.list_transactions().unwrap();
    let shopee = filter_transactions(&all, Platform::Shopee, None);
    let tiktok = filter_transactions(&all, Platform::TikTok, None);
    assert_eq!(shopee.len(), 2);
    assert_eq!(tiktok.len(), 3);

    let stats = dashboard_stats(&shopee, NaiveDate::from_ymd_opt(2025, 10, 21).unwrap());
    // 196250 - 59000*2 and 98125 - 59000
    assert_eq!(stats.today_profit, dec("39125"));
    assert_eq!(stats.week_profit, dec("117375"));
    assert_eq!(stats.top_products[0].product_name, "Shopee Daily - 2025-10-20");
}

#[test]
fn test_failed_import_changes_nothing() {
    let catalog = InMemoryCatalog::new();
    let report = import_and_persist(
        &catalog,
        &service(""),
        b"Order ID,Notes\n1,hello\n",
        SourceKind::TabularText,
    );

    assert_eq!(report.stage, ImportStage::Failed);
    assert_eq!(report.failed_at, Some(ImportStage::HeaderResolved));
    assert!(catalog.list_products().unwrap().is_empty());
    assert!(catalog.list_transactions().unwrap().is_empty());
}

#[test]
fn test_existing_products_keep_ids_across_sources() {
    let catalog = InMemoryCatalog::new();
    catalog
        .upsert_products(&[Product::new("Kaos Polos Hitam", dec("40000"), dec("70000"))])
        .unwrap();
    let before = catalog.list_products().unwrap()[0].id;

    let report = import_and_persist(&catalog, &service(""), ORDERS_CSV.as_bytes(), SourceKind::TabularText);
    assert_eq!(report.stats.new_products, 1);

    let products = catalog.list_products().unwrap();
    let kaos = products.iter().find(|p| p.id == before).unwrap();
    assert_eq!(kaos.buy_price, dec("45000"));
}

#[test]
fn test_back_to_back_imports_each_recorded() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = create_test_catalog(&temp_dir);
    let service = service("");
    let files: [&[u8]; 2] = [
        b"Product Name,Quantity,Order Amount\nKaos,1,50000\n",
        b"Product Name,Quantity,Order Amount\nTopi,1,30000\n",
    ];

    let mut checksums = Vec::new();
    for bytes in files {
        let existing = catalog.list_products().unwrap();
        let report = service.import_file_on(bytes, SourceKind::TabularText, &existing, &ImportConfig::default(), processing_date());
        let batch = BatchRecord {
            batch_id: report.batch_id.clone(),
            source_kind: SourceKind::TabularText.to_string(),
            source_format: report.format.map(|f| f.as_str().to_string()),
            file_name: None,
            checksum: report.checksum.clone(),
            new_products: report.stats.new_products as i64,
            new_transactions: report.stats.new_transactions as i64,
            imported_at: None,
        };
        catalog.persist_import(&report.products, &report.transactions, &batch).unwrap();
        checksums.push(report.checksum);
    }

    assert_eq!(catalog.list_batches().unwrap().len(), 2);
    for checksum in &checksums {
        assert!(catalog.find_batch_by_checksum(checksum).unwrap().is_some());
    }
    assert_eq!(catalog.list_transactions().unwrap().len(), 2);
}

// ============================================================================
// Context + Concurrency
// ============================================================================

#[test]
fn test_context_creates_database_in_payout_dir() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("nested").join(".payout");

    let ctx = PayoutContext::new(&dir).unwrap();
    assert!(dir.join("payout.duckdb").exists());
    assert_eq!(ctx.config.import.default_unit_cost, dec("59000"));
    assert!(ctx.catalog.list_products().unwrap().is_empty());
}

#[test]
fn test_shared_catalog_accepts_concurrent_writers() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(create_test_catalog(&temp_dir));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                let products: Vec<Product> = (0..5)
                    .map(|j| Product::new(format!("Produk {}-{}", i, j), dec("59000"), dec("83218")))
                    .collect();
                catalog.upsert_products(&products).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(catalog.list_products().unwrap().len(), 20);
}
