//! Stats service - profit summaries over the ledger

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::Transaction;
use crate::ports::CatalogStore;

const TOP_PRODUCTS: usize = 5;

/// Marketplace a transaction came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    All,
    Shopee,
    TikTok,
}

impl Platform {
    /// Shopee transactions are recognized by their synthetic product names
    /// or the statement order id in the notes; everything else is TikTok.
    pub fn of(tx: &Transaction) -> Platform {
        let shopee = tx.product_name.contains("Shopee Daily")
            || tx.product_name.starts_with("Shopee - ")
            || tx.notes.as_deref().is_some_and(|n| n.contains("SHOPEE-") || n.contains("Shopee Order:"));
        if shopee {
            Platform::Shopee
        } else {
            Platform::TikTok
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        *self == Platform::All || *self == Platform::of(tx)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::All => "all",
            Platform::Shopee => "shopee",
            Platform::TikTok => "tiktok",
        })
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Platform::All),
            "shopee" => Ok(Platform::Shopee),
            "tiktok" => Ok(Platform::TikTok),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// Profit and quantity of one product across the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTotal {
    pub product_name: String,
    pub total_profit: Decimal,
    pub total_quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today_profit: Decimal,
    /// Today and the seven days before it
    pub week_profit: Decimal,
    /// Current calendar month
    pub month_profit: Decimal,
    pub total_transactions: usize,
    pub top_products: Vec<ProductTotal>,
}

/// Transactions on a platform, optionally on one date
pub fn filter_transactions(transactions: &[Transaction], platform: Platform, date: Option<NaiveDate>) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| platform.matches(t))
        .filter(|t| date.map_or(true, |d| t.date == d))
        .cloned()
        .collect()
}

/// Summarize transactions relative to `today`
pub fn dashboard_stats(transactions: &[Transaction], today: NaiveDate) -> DashboardStats {
    let week_start = today - Duration::days(7);
    let sum = |pred: &dyn Fn(NaiveDate) -> bool| -> Decimal {
        transactions.iter().filter(|t| pred(t.date)).map(|t| t.profit).sum()
    };

    let today_profit = sum(&|d| d == today);
    let week_profit = sum(&|d| d >= week_start && d <= today);
    let month_profit = sum(&|d| d.year() == today.year() && d.month() == today.month());

    // Keep first-seen order so ties rank stably
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, (Decimal, u64)> = HashMap::new();
    for t in transactions {
        let entry = totals.entry(t.product_name.as_str()).or_insert_with(|| {
            order.push(t.product_name.as_str());
            (Decimal::ZERO, 0)
        });
        entry.0 += t.profit;
        entry.1 += u64::from(t.quantity);
    }

    let mut top_products: Vec<ProductTotal> = order
        .into_iter()
        .map(|name| {
            let (profit, quantity) = totals[name];
            ProductTotal {
                product_name: name.to_string(),
                total_profit: profit,
                total_quantity: quantity,
            }
        })
        .collect();
    top_products.sort_by(|a, b| b.total_profit.cmp(&a.total_profit));
    top_products.truncate(TOP_PRODUCTS);

    DashboardStats {
        today_profit,
        week_profit,
        month_profit,
        total_transactions: transactions.len(),
        top_products,
    }
}

/// Ledger statistics over a catalog store
pub struct StatsService {
    catalog: Arc<dyn CatalogStore>,
}

impl StatsService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    pub fn transactions(&self, platform: Platform, date: Option<NaiveDate>) -> Result<Vec<Transaction>> {
        Ok(filter_transactions(&self.catalog.list_transactions()?, platform, date))
    }

    pub fn dashboard(&self, platform: Platform) -> Result<DashboardStats> {
        let transactions = self.transactions(platform, None)?;
        Ok(dashboard_stats(&transactions, Local::now().date_naive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn tx(name: &str, profit: i64, quantity: u32, date: NaiveDate) -> Transaction {
        let mut t = Transaction::new(Uuid::new_v4(), name, quantity, date);
        t.profit = Decimal::new(profit, 0);
        t
    }

    #[test]
    fn test_platform_detection() {
        let daily = tx("Shopee Daily - 2025-10-20", 0, 1, day(20));
        let income = tx("Shopee - 2510A", 0, 1, day(20));
        let mut noted = tx("Kaos", 0, 1, day(20));
        noted.notes = Some("Order ID: SHOPEE-2025-10-20".to_string());
        let tiktok = tx("Kaos", 0, 1, day(20));

        assert_eq!(Platform::of(&daily), Platform::Shopee);
        assert_eq!(Platform::of(&income), Platform::Shopee);
        assert_eq!(Platform::of(&noted), Platform::Shopee);
        assert_eq!(Platform::of(&tiktok), Platform::TikTok);
        assert!(Platform::All.matches(&tiktok));
        assert_eq!("TikTok".parse::<Platform>().unwrap(), Platform::TikTok);
        assert!("lazada".parse::<Platform>().is_err());
    }

    #[test]
    fn test_filter_by_platform_and_date() {
        let all = vec![
            tx("Shopee Daily - 2025-10-20", 10, 1, day(20)),
            tx("Kaos", 20, 1, day(20)),
            tx("Kaos", 30, 1, day(21)),
        ];
        assert_eq!(filter_transactions(&all, Platform::TikTok, None).len(), 2);
        assert_eq!(filter_transactions(&all, Platform::TikTok, Some(day(20))).len(), 1);
        assert_eq!(filter_transactions(&all, Platform::All, Some(day(20))).len(), 2);
    }

    #[test]
    fn test_dashboard_windows() {
        let all = vec![
            tx("A", 100, 1, day(20)),
            tx("A", 50, 2, day(13)),
            tx("B", 10, 1, day(12)),
            tx("B", 1, 1, NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()),
        ];
        let stats = dashboard_stats(&all, day(20));
        assert_eq!(stats.today_profit, Decimal::new(100, 0));
        assert_eq!(stats.week_profit, Decimal::new(150, 0));
        assert_eq!(stats.month_profit, Decimal::new(160, 0));
        assert_eq!(stats.total_transactions, 4);
        assert_eq!(stats.top_products[0].product_name, "A");
        assert_eq!(stats.top_products[0].total_quantity, 3);
        assert_eq!(stats.top_products[1].total_profit, Decimal::new(11, 0));
    }

    #[test]
    fn test_top_products_capped() {
        let all: Vec<Transaction> = (0..8).map(|i| tx(&format!("P{}", i), i, 1, day(1))).collect();
        let stats = dashboard_stats(&all, day(20));
        assert_eq!(stats.top_products.len(), 5);
        assert_eq!(stats.top_products[0].product_name, "P7");
    }
}
