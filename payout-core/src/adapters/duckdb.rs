//! DuckDB catalog implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Product, Transaction};
use crate::ports::CatalogStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// True if an open error looks like another process holding the file
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn db_err(e: impl std::fmt::Display) -> Error {
    Error::database(e.to_string())
}

/// One persisted import, keyed by batch id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub batch_id: String,
    pub source_kind: String,
    pub source_format: Option<String>,
    pub file_name: Option<String>,
    pub checksum: String,
    pub new_products: i64,
    pub new_transactions: i64,
    pub imported_at: Option<String>,
}

/// Catalog store backed by a DuckDB file
pub struct DuckDbCatalog {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbCatalog {
    /// Open (or create) the database and apply pending migrations.
    ///
    /// Opening retries with exponential backoff while another process holds
    /// the file.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let catalog = Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    };
                    catalog.run_migrations()?;
                    return Ok(catalog);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// In-memory catalog, migrated
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let catalog = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        catalog.run_migrations()?;
        Ok(catalog)
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading off: nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.conn.lock().map_err(|e| anyhow!("connection lock poisoned: {}", e))?;
        MigrationService::new(&conn).run_pending()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> duckdb::Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().map_err(db_err)?;
        f(&mut conn).map_err(db_err)
    }

    // === Import batches ===

    /// Record a batch. A batch id that is already recorded is an error.
    pub fn record_batch(&self, batch: &BatchRecord) -> Result<()> {
        self.with_conn(|conn| insert_batch_row(conn, batch))
    }

    /// Write an import's products, transactions and batch record atomically
    pub fn persist_import(&self, products: &[Product], transactions: &[Transaction], batch: &BatchRecord) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            upsert_product_rows(&tx, products)?;
            upsert_transaction_rows(&tx, transactions)?;
            insert_batch_row(&tx, batch)?;
            tx.commit()?;
            debug!(
                batch_id = %batch.batch_id,
                products = products.len(),
                transactions = transactions.len(),
                "persisted import"
            );
            Ok(())
        })
    }

    /// Most recent batch that imported the same bytes
    pub fn find_batch_by_checksum(&self, checksum: &str) -> Result<Option<BatchRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT batch_id, source_kind, source_format, file_name, checksum,
                        new_products, new_transactions, imported_at::VARCHAR
                 FROM import_batches WHERE checksum = ?
                 ORDER BY imported_at DESC LIMIT 1",
                [checksum],
                row_to_batch,
            )
            .optional()
        })
    }

    pub fn list_batches(&self) -> Result<Vec<BatchRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT batch_id, source_kind, source_format, file_name, checksum,
                        new_products, new_transactions, imported_at::VARCHAR
                 FROM import_batches ORDER BY imported_at DESC",
            )?;
            let rows = stmt.query_map([], row_to_batch)?.collect();
            rows
        })
    }
}

impl CatalogStore for DuckDbCatalog {
    fn list_products(&self) -> Result<Vec<Product>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, buy_price, sell_price, category, created_at::VARCHAR
                 FROM products ORDER BY created_at, name",
            )?;
            let products = stmt.query_map([], row_to_product)?.collect();
            products
        })
    }

    fn upsert_products(&self, products: &[Product]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            upsert_product_rows(&tx, products)?;
            tx.commit()?;
            debug!(count = products.len(), "upserted products");
            Ok(())
        })
    }

    fn delete_product(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM products WHERE id = ?", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, product_id, product_name, quantity, buy_price, sell_price, profit,
                        date::VARCHAR, notes, created_at::VARCHAR
                 FROM transactions
                 ORDER BY date DESC, created_at DESC",
            )?;
            let transactions = stmt.query_map([], row_to_transaction)?.collect();
            transactions
        })
    }

    fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            upsert_transaction_rows(&tx, transactions)?;
            tx.commit()?;
            debug!(count = transactions.len(), "upserted transactions");
            Ok(())
        })
    }

    fn delete_transaction(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }
}

// Statement helpers, shared by the single-purpose upserts and persist_import

fn upsert_product_rows(conn: &Connection, products: &[Product]) -> duckdb::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO products (id, name, buy_price, sell_price, category, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            buy_price = EXCLUDED.buy_price,
            sell_price = EXCLUDED.sell_price,
            category = COALESCE(EXCLUDED.category, products.category)",
    )?;
    for p in products {
        stmt.execute(params![
            p.id.to_string(),
            p.name,
            p.buy_price.to_string(),
            p.sell_price.to_string(),
            p.category,
            p.created_at.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        ])?;
    }
    Ok(())
}

fn upsert_transaction_rows(conn: &Connection, transactions: &[Transaction]) -> duckdb::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO transactions (id, product_id, product_name, quantity, buy_price,
                                   sell_price, profit, date, notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (id) DO UPDATE SET
            product_id = EXCLUDED.product_id,
            product_name = EXCLUDED.product_name,
            quantity = EXCLUDED.quantity,
            buy_price = EXCLUDED.buy_price,
            sell_price = EXCLUDED.sell_price,
            profit = EXCLUDED.profit,
            date = EXCLUDED.date,
            notes = EXCLUDED.notes",
    )?;
    for t in transactions {
        stmt.execute(params![
            t.id.to_string(),
            t.product_id.to_string(),
            t.product_name,
            t.quantity as i64,
            t.buy_price.to_string(),
            t.sell_price.to_string(),
            t.profit.to_string(),
            t.date.to_string(),
            t.notes,
            t.created_at.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        ])?;
    }
    Ok(())
}

fn insert_batch_row(conn: &Connection, batch: &BatchRecord) -> duckdb::Result<()> {
    conn.execute(
        "INSERT INTO import_batches (batch_id, source_kind, source_format, file_name, checksum,
                                     new_products, new_transactions)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            batch.batch_id,
            batch.source_kind,
            batch.source_format,
            batch.file_name,
            batch.checksum,
            batch.new_products,
            batch.new_transactions,
        ],
    )?;
    Ok(())
}

// Row helpers

fn conversion_err(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn get_uuid(row: &duckdb::Row, idx: usize) -> duckdb::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e))
}

fn get_decimal(row: &duckdb::Row, idx: usize) -> duckdb::Result<Decimal> {
    let s: String = row.get(idx)?;
    Decimal::from_str(&s).map_err(|e| conversion_err(idx, e))
}

fn get_date(row: &duckdb::Row, idx: usize) -> duckdb::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_err(idx, e))
}

/// DuckDB renders TIMESTAMP as `YYYY-MM-DD HH:MM:SS[.ffffff]`
fn get_timestamp(row: &duckdb::Row, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|dt| dt.and_utc())
        .map_err(|e| conversion_err(idx, e))
}

fn row_to_product(row: &duckdb::Row) -> duckdb::Result<Product> {
    Ok(Product {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        buy_price: get_decimal(row, 2)?,
        sell_price: get_decimal(row, 3)?,
        category: row.get(4)?,
        created_at: get_timestamp(row, 5)?,
    })
}

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    let quantity: i64 = row.get(3)?;
    Ok(Transaction {
        id: get_uuid(row, 0)?,
        product_id: get_uuid(row, 1)?,
        product_name: row.get(2)?,
        quantity: u32::try_from(quantity).unwrap_or(0),
        buy_price: get_decimal(row, 4)?,
        sell_price: get_decimal(row, 5)?,
        profit: get_decimal(row, 6)?,
        date: get_date(row, 7)?,
        notes: row.get(8)?,
        created_at: get_timestamp(row, 9)?,
    })
}

fn row_to_batch(row: &duckdb::Row) -> duckdb::Result<BatchRecord> {
    Ok(BatchRecord {
        batch_id: row.get(0)?,
        source_kind: row.get(1)?,
        source_format: row.get(2)?,
        file_name: row.get(3)?,
        checksum: row.get(4)?,
        new_products: row.get(5)?,
        new_transactions: row.get(6)?,
        imported_at: row.get(7)?,
    })
}
