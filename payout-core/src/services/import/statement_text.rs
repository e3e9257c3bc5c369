//! Unstructured text decoding - daily (date, amount) pairs from statement text

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

static DAILY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}/\d{2}/\d{2})\s+(\d{1,3}(?:,\d{3})*)").unwrap());

/// Brand tokens that identify a Shopee statement
const SHOPEE_TOKENS: &[&str] = &["Shopee", "shopee"];

/// One aggregated day of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DailyAmount {
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl DailyAmount {
    pub fn order_id(&self) -> String {
        format!("SHOPEE-{}", self.date.format("%Y-%m-%d"))
    }

    pub fn label(&self) -> String {
        format!("Shopee Daily - {}", self.date.format("%Y-%m-%d"))
    }
}

/// Result of scanning statement text
#[derive(Debug, Default)]
pub struct StatementScan {
    pub pairs: Vec<DailyAmount>,
    pub errors: Vec<String>,
}

pub fn is_shopee_statement(text: &str) -> bool {
    SHOPEE_TOKENS.iter().any(|t| text.contains(t))
}

/// Extract unique (date, amount) pairs, in first-seen order.
///
/// Amounts at or above `ceiling` are statement totals, not days, and are
/// dropped together with non-positive amounts.
pub fn scan_statement(text: &str, ceiling: Decimal) -> StatementScan {
    let mut scan = StatementScan::default();

    if !is_shopee_statement(text) {
        scan.errors.push("not a Shopee statement: brand token not found; use the spreadsheet import for TikTok Shop".to_string());
        return scan;
    }

    let mut seen: HashSet<DailyAmount> = HashSet::new();
    for caps in DAILY_AMOUNT.captures_iter(text) {
        let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y/%m/%d") else {
            scan.errors.push(format!("invalid statement date: {}", &caps[1]));
            continue;
        };
        let Ok(amount) = caps[2].replace(',', "").parse::<Decimal>() else {
            continue;
        };

        if amount <= Decimal::ZERO || amount >= ceiling {
            continue;
        }

        let pair = DailyAmount { date, amount };
        if seen.insert(pair.clone()) {
            scan.pairs.push(pair);
        }
    }

    debug!(pairs = scan.pairs.len(), "scanned statement text");
    if scan.pairs.is_empty() {
        scan.errors.push("no daily settlement amounts found in statement".to_string());
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceiling() -> Decimal {
        Decimal::new(10_000_000, 0)
    }

    #[test]
    fn test_duplicate_page_overlap_yields_one_pair() {
        let text = "Shopee Weekly Report\n2025/10/20   196,250\n--- page 2 ---\n2025/10/20   196,250\n";
        let scan = scan_statement(text, ceiling());
        assert_eq!(
            scan.pairs,
            vec![DailyAmount {
                date: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
                amount: Decimal::new(196_250, 0),
            }]
        );
        assert!(scan.errors.is_empty());
    }

    #[test]
    fn test_same_day_different_amounts_are_kept() {
        let text = "shopee\n2025/10/20 196,250\n2025/10/20 98,125\n2025/10/21 1,000";
        let scan = scan_statement(text, ceiling());
        assert_eq!(scan.pairs.len(), 3);
        assert_eq!(scan.pairs[2].order_id(), "SHOPEE-2025-10-21");
        assert_eq!(scan.pairs[2].label(), "Shopee Daily - 2025-10-21");
    }

    #[test]
    fn test_totals_and_zero_amounts_dropped() {
        let text = "Shopee\n2025/10/20 0\n2025/10/26 12,500,000\n2025/10/21 294,375";
        let scan = scan_statement(text, ceiling());
        assert_eq!(scan.pairs.len(), 1);
        assert_eq!(scan.pairs[0].amount, Decimal::new(294_375, 0));
    }

    #[test]
    fn test_missing_brand_yields_no_pairs() {
        let text = "TikTok Shop Weekly\n2025/10/20 196,250";
        let scan = scan_statement(text, ceiling());
        assert!(scan.pairs.is_empty());
        assert!(scan.errors[0].contains("not a Shopee statement"));
    }

    #[test]
    fn test_impossible_date_is_reported() {
        let text = "Shopee\n2025/13/40 1,000\n2025/10/20 2,000";
        let scan = scan_statement(text, ceiling());
        assert_eq!(scan.pairs.len(), 1);
        assert_eq!(scan.errors.len(), 1);
    }
}
