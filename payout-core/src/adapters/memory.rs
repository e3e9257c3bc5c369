//! In-memory catalog, for tests and previews

use std::sync::RwLock;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Product, Transaction};
use crate::ports::CatalogStore;

/// Catalog store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    transactions: RwLock<Vec<Transaction>>,
}

fn poisoned<T>(_: T) -> Error {
    Error::database("catalog lock poisoned")
}

/// Replace items with the same id in place, append the rest
fn upsert_by_id<T: Clone>(items: &mut Vec<T>, incoming: &[T], id: impl Fn(&T) -> Uuid) {
    for item in incoming {
        match items.iter_mut().find(|existing| id(existing) == id(item)) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for InMemoryCatalog {
    fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().map_err(poisoned)?.clone())
    }

    fn upsert_products(&self, products: &[Product]) -> Result<()> {
        let mut stored = self.products.write().map_err(poisoned)?;
        upsert_by_id(&mut stored, products, |p| p.id);
        Ok(())
    }

    fn delete_product(&self, id: Uuid) -> Result<bool> {
        let mut stored = self.products.write().map_err(poisoned)?;
        let before = stored.len();
        stored.retain(|p| p.id != id);
        Ok(stored.len() < before)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let mut transactions = self.transactions.read().map_err(poisoned)?.clone();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(transactions)
    }

    fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let mut stored = self.transactions.write().map_err(poisoned)?;
        upsert_by_id(&mut stored, transactions, |t| t.id);
        Ok(())
    }

    fn delete_transaction(&self, id: Uuid) -> Result<bool> {
        let mut stored = self.transactions.write().map_err(poisoned)?;
        let before = stored.len();
        stored.retain(|t| t.id != id);
        Ok(stored.len() < before)
    }
}
