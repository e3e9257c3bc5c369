//! Catalog store port - product and transaction persistence

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Product, Transaction};

/// Product/transaction storage abstraction
///
/// The import pipeline never calls this itself. Callers read the current
/// catalog, run an import, then write the returned records back.
pub trait CatalogStore: Send + Sync {
    // === Products ===

    /// All products in the catalog
    fn list_products(&self) -> Result<Vec<Product>>;

    /// Insert or update products by id
    fn upsert_products(&self, products: &[Product]) -> Result<()>;

    /// Delete a product. Returns false if it did not exist.
    fn delete_product(&self, id: Uuid) -> Result<bool>;

    // === Transactions ===

    /// All transactions, newest date first
    fn list_transactions(&self) -> Result<Vec<Transaction>>;

    /// Insert or update transactions by id
    fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<()>;

    /// Delete a transaction. Returns false if it did not exist.
    fn delete_transaction(&self, id: Uuid) -> Result<bool>;
}
