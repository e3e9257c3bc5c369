//! Transaction domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker placed at the start of the notes of a returned order
pub const RETURN_MARKER: &str = "RETURN";

/// A single priced sale (or return) in the ledger
///
/// Transactions are created fresh for every imported entry and are never
/// modified afterwards; the store may delete them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub profit: Decimal,
    /// Settlement date (not the order creation date)
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(
        product_id: Uuid,
        product_name: impl Into<String>,
        quantity: u32,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            product_name: product_name.into(),
            quantity,
            buy_price: Decimal::ZERO,
            sell_price: Decimal::ZERO,
            profit: Decimal::ZERO,
            date,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// True if the notes carry the return marker
    pub fn is_return(&self) -> bool {
        self.notes
            .as_deref()
            .map(|n| n.starts_with(RETURN_MARKER))
            .unwrap_or(false)
    }
}
