//! Product domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product in the seller's catalog
///
/// Products are keyed by their name, compared case-insensitively. Imports
/// create products or overwrite their prices; they never delete them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Unit cost paid by the seller
    pub buy_price: Decimal,
    /// Latest observed unit sale price
    pub sell_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product with a fresh id
    pub fn new(name: impl Into<String>, buy_price: Decimal, sell_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            buy_price,
            sell_price,
            category: None,
            created_at: Utc::now(),
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Catalog key: the lowercased name
    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    /// Per-unit margin at current prices
    pub fn unit_margin(&self) -> Decimal {
        self.sell_price - self.buy_price
    }
}

/// Normalize a product name into its catalog key
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_insensitive() {
        let a = Product::new("Kaos Polos Hitam", Decimal::ZERO, Decimal::ZERO);
        let b = Product::new("KAOS polos hitam ", Decimal::ZERO, Decimal::ZERO);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_serializes_camel_case() {
        let p = Product::new("Widget", Decimal::new(10000, 0), Decimal::new(12500, 0))
            .with_category("TikTok Shop");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["buyPrice"], serde_json::json!("10000"));
        assert_eq!(json["sellPrice"], serde_json::json!("12500"));
        assert_eq!(json["category"], serde_json::json!("TikTok Shop"));
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_unit_margin() {
        let p = Product::new("Widget", Decimal::new(10000, 0), Decimal::new(12500, 0));
        assert_eq!(p.unit_margin(), Decimal::new(2500, 0));
    }
}
