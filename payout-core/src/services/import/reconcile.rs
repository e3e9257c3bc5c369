//! Reconciliation - merge normalized entries into the catalog

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::domain::{
    format_rupiah, name_key, NormalizedEntry, Product, ProfitBasis, SourceFormat, Transaction, RETURN_MARKER,
};

/// Counters for one import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub new_products: usize,
    pub new_transactions: usize,
    /// Sum of profit over non-return transactions
    pub total_profit: Decimal,
    pub returns: usize,
    /// Entries whose quantity was estimated from the settlement amount
    pub inferred_quantities: usize,
}

/// Updated catalog plus the new transactions
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Existing products (possibly repriced) followed by new ones
    pub products: Vec<Product>,
    pub transactions: Vec<Transaction>,
    pub stats: ImportStats,
}

/// Profit of one entry against the product's buy price
pub fn entry_profit(entry: &NormalizedEntry, buy_price: Decimal, basis: ProfitBasis) -> Decimal {
    if entry.is_return {
        return Decimal::ZERO;
    }
    let quantity = Decimal::from(entry.quantity);
    match basis {
        ProfitBasis::Settlement => entry.settlement_amount - buy_price * quantity,
        ProfitBasis::UnitMargin => (entry.sell_price - buy_price) * quantity,
    }
}

/// Audit notes carried by the transaction
pub fn transaction_notes(entry: &NormalizedEntry, format: SourceFormat) -> Option<String> {
    let order_id = entry.source_order_id.as_str();

    if format == SourceFormat::ShopeeIncome {
        let total = format_rupiah(entry.settlement_amount);
        return Some(if entry.is_return {
            format!("{} | Shopee Order: {}\nTotal: {}", RETURN_MARKER, order_id, total)
        } else {
            format!("Shopee Order: {}\nTotal: {}\nQty: {}", order_id, total, entry.quantity)
        });
    }

    let mut parts: Vec<String> = Vec::new();
    if !order_id.is_empty() {
        parts.push(format!("Order ID: {}", order_id));
    }
    if let Some(variation) = &entry.variation {
        parts.push(variation.clone());
    }

    if entry.is_return {
        let mut notes = std::iter::once(RETURN_MARKER.to_string())
            .chain(parts)
            .collect::<Vec<_>>()
            .join(" | ");
        if let Some(refund) = entry.refund_subtotal.filter(|r| *r < Decimal::ZERO) {
            notes.push_str(&format!("\nRefund Subtotal: {}", format_rupiah(refund)));
        }
        Some(notes)
    } else if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

/// Merge entries into the catalog by case-insensitive name.
///
/// Every entry yields exactly one fresh transaction. A new name creates a
/// product priced at the entry's unit cost (or the default cost). A known
/// name gets its sell price overwritten, and its buy price when the entry
/// carries a positive unit cost. Returns leave product prices alone.
pub fn reconcile(
    entries: &[NormalizedEntry],
    existing: &[Product],
    format: SourceFormat,
    config: &ImportConfig,
) -> Reconciled {
    let mut products: Vec<Product> = existing.to_vec();
    let mut index: HashMap<String, usize> = HashMap::with_capacity(products.len());
    for (i, product) in products.iter().enumerate() {
        index.entry(product.key()).or_insert(i);
    }

    let basis = format.profit_basis();
    let mut transactions = Vec::with_capacity(entries.len());
    let mut stats = ImportStats::default();

    for entry in entries {
        let positive_cost = entry.unit_cost.filter(|c| *c > Decimal::ZERO);
        let key = name_key(&entry.label);

        let slot = match index.get(&key) {
            Some(&i) => {
                if !entry.is_return {
                    let product = &mut products[i];
                    product.sell_price = entry.sell_price;
                    if let Some(cost) = positive_cost {
                        product.buy_price = cost;
                    }
                }
                i
            }
            None => {
                let sell = if entry.is_return { Decimal::ZERO } else { entry.sell_price };
                let product = Product::new(
                    entry.label.trim(),
                    positive_cost.unwrap_or(config.default_unit_cost),
                    sell,
                )
                .with_category(format.category());
                products.push(product);
                index.insert(key, products.len() - 1);
                products.len() - 1
            }
        };

        let product = &products[slot];
        let profit = entry_profit(entry, product.buy_price, basis);

        let mut tx = Transaction::new(product.id, product.name.clone(), entry.quantity, entry.date);
        tx.buy_price = product.buy_price;
        tx.sell_price = entry.sell_price;
        tx.profit = profit;
        tx.notes = transaction_notes(entry, format);

        if entry.is_return {
            stats.returns += 1;
        } else {
            stats.total_profit += profit;
        }
        if entry.quantity_inferred {
            stats.inferred_quantities += 1;
        }
        transactions.push(tx);
    }

    stats.new_products = products.len().saturating_sub(existing.len());
    stats.new_transactions = transactions.len();

    Reconciled {
        products,
        transactions,
        stats,
    }
}

/// Product id lookup by catalog key, for callers merging results
pub fn product_ids_by_key(products: &[Product]) -> HashMap<String, Uuid> {
    products.iter().map(|p| (p.key(), p.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn entry(label: &str, settlement: &str, quantity: u32) -> NormalizedEntry {
        let settlement = dec(settlement);
        NormalizedEntry {
            source_order_id: "577001".to_string(),
            label: label.to_string(),
            settlement_amount: settlement,
            quantity,
            date: NaiveDate::from_ymd_opt(2025, 10, 29).unwrap(),
            variation: None,
            unit_cost: None,
            refund_subtotal: None,
            sell_price: settlement / Decimal::from(quantity.max(1)),
            is_return: false,
            quantity_inferred: true,
        }
    }

    fn return_entry(label: &str, settlement: &str) -> NormalizedEntry {
        let mut e = entry(label, settlement, 0);
        e.is_return = true;
        e.quantity_inferred = false;
        e.sell_price = e.settlement_amount;
        e
    }

    #[test]
    fn test_new_product_uses_default_cost_and_category() {
        let config = ImportConfig::default();
        let result = reconcile(&[entry("Kaos Hitam", "166436", 2)], &[], SourceFormat::TikTokIncome, &config);

        assert_eq!(result.products.len(), 1);
        let product = &result.products[0];
        assert_eq!(product.buy_price, dec("59000"));
        assert_eq!(product.sell_price, dec("83218"));
        assert_eq!(product.category.as_deref(), Some("TikTok Shop Income"));

        let tx = &result.transactions[0];
        assert_eq!(tx.product_id, product.id);
        // 166436 - 59000 * 2
        assert_eq!(tx.profit, dec("48436"));
        assert_eq!(result.stats.total_profit, dec("48436"));
        assert_eq!(result.stats.new_products, 1);
        assert_eq!(result.stats.inferred_quantities, 1);
    }

    #[test]
    fn test_existing_product_matched_case_insensitively() {
        let existing = vec![Product::new("KAOS HITAM", dec("50000"), dec("80000"))];
        let result = reconcile(
            &[entry("kaos hitam", "90000", 1)],
            &existing,
            SourceFormat::TikTokIncome,
            &ImportConfig::default(),
        );

        assert_eq!(result.products.len(), 1);
        assert_eq!(result.products[0].id, existing[0].id);
        assert_eq!(result.products[0].sell_price, dec("90000"));
        assert_eq!(result.products[0].buy_price, dec("50000"));
        assert_eq!(result.transactions[0].product_name, "KAOS HITAM");
        assert_eq!(result.transactions[0].profit, dec("40000"));
        assert_eq!(result.stats.new_products, 0);
    }

    #[test]
    fn test_positive_unit_cost_overwrites_buy_price() {
        let existing = vec![Product::new("Widget", dec("8000"), dec("11000"))];
        let mut e = entry("Widget", "25000", 2);
        e.unit_cost = Some(dec("10000"));
        let result = reconcile(&[e], &existing, SourceFormat::TikTokOrders, &ImportConfig::default());

        assert_eq!(result.products[0].buy_price, dec("10000"));
        assert_eq!(result.products[0].sell_price, dec("12500"));
        // (12500 - 10000) * 2
        assert_eq!(result.transactions[0].profit, dec("5000"));
    }

    #[test]
    fn test_last_write_wins_within_batch() {
        let entries = vec![entry("Widget", "83218", 1), entry("WIDGET", "90000", 1)];
        let result = reconcile(&entries, &[], SourceFormat::TikTokIncome, &ImportConfig::default());
        assert_eq!(result.products.len(), 1);
        assert_eq!(result.products[0].name, "Widget");
        assert_eq!(result.products[0].sell_price, dec("90000"));
        assert_eq!(result.transactions.len(), 2);
    }

    #[test]
    fn test_returns_have_zero_profit_and_keep_prices() {
        let existing = vec![Product::new("Kaos", dec("59000"), dec("83218"))];
        let mut r = return_entry("Kaos", "-250000");
        r.refund_subtotal = Some(dec("-83218"));
        r.variation = Some("Hitam, L".to_string());

        let result = reconcile(&[r], &existing, SourceFormat::TikTokIncome, &ImportConfig::default());
        let tx = &result.transactions[0];
        assert_eq!(tx.profit, Decimal::ZERO);
        assert_eq!(tx.quantity, 0);
        assert!(tx.is_return());
        assert_eq!(
            tx.notes.as_deref(),
            Some("RETURN | Order ID: 577001 | Hitam, L\nRefund Subtotal: Rp -83.218")
        );
        assert_eq!(result.products[0].sell_price, dec("83218"));
        assert_eq!(result.stats.returns, 1);
        assert_eq!(result.stats.total_profit, Decimal::ZERO);
    }

    #[test]
    fn test_product_created_by_return_has_zero_sell_price() {
        let result = reconcile(
            &[return_entry("Topi", "-1000")],
            &[],
            SourceFormat::TikTokIncome,
            &ImportConfig::default(),
        );
        assert_eq!(result.products[0].sell_price, Decimal::ZERO);
        assert_eq!(result.stats.new_products, 1);
    }

    #[test]
    fn test_products_idempotent_transactions_not() {
        let entries = vec![entry("Kaos", "83218", 1), entry("Topi", "83218", 1), entry("kaos", "83218", 1)];
        let config = ImportConfig::default();

        let first = reconcile(&entries, &[], SourceFormat::TikTokIncome, &config);
        let second = reconcile(&entries, &first.products, SourceFormat::TikTokIncome, &config);

        assert_eq!(first.products.len(), 2);
        assert_eq!(second.products.len(), 2);
        assert_eq!(second.stats.new_products, 0);

        let first_ids = product_ids_by_key(&first.products);
        let second_ids = product_ids_by_key(&second.products);
        assert_eq!(first_ids, second_ids);

        // fresh transaction ids each run
        let all: Vec<Uuid> = first.transactions.iter().chain(&second.transactions).map(|t| t.id).collect();
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_shopee_income_notes() {
        let mut e = entry("Shopee - 2510A", "196250", 2);
        e.source_order_id = "2510A".to_string();
        assert_eq!(
            transaction_notes(&e, SourceFormat::ShopeeIncome).as_deref(),
            Some("Shopee Order: 2510A\nTotal: Rp 196.250\nQty: 2")
        );

        let mut r = return_entry("Shopee - 2510B", "0");
        r.source_order_id = "2510B".to_string();
        assert_eq!(
            transaction_notes(&r, SourceFormat::ShopeeIncome).as_deref(),
            Some("RETURN | Shopee Order: 2510B\nTotal: Rp 0")
        );
    }

    #[test]
    fn test_notes_without_order_id() {
        let mut e = entry("Kaos", "1000", 1);
        e.source_order_id.clear();
        assert_eq!(transaction_notes(&e, SourceFormat::TikTokOrders), None);
        e.variation = Some("Merah".to_string());
        assert_eq!(transaction_notes(&e, SourceFormat::TikTokOrders).as_deref(), Some("Merah"));
    }
}
