//! Source kinds and the normalized entry produced by the import pipeline

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical encoding of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Delimited text (CSV order export)
    TabularText,
    /// Workbook (income/settlement export)
    Spreadsheet,
    /// Text extracted from a PDF statement
    UnstructuredText,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::TabularText => "tabular-text",
            SourceKind::Spreadsheet => "spreadsheet",
            SourceKind::UnstructuredText => "unstructured-text",
        }
    }

    /// Guess the kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(SourceKind::TabularText),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceKind::Spreadsheet),
            "pdf" => Some(SourceKind::UnstructuredText),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tabular-text" | "csv" => Ok(SourceKind::TabularText),
            "spreadsheet" | "excel" => Ok(SourceKind::Spreadsheet),
            "unstructured-text" | "pdf" => Ok(SourceKind::UnstructuredText),
            other => Err(format!("Unknown source kind: {}", other)),
        }
    }
}

/// Concrete export layout, detected while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFormat {
    /// TikTok Shop "All Orders" CSV export (line-level quantity and unit cost)
    TikTokOrders,
    /// TikTok Shop income/settlement workbook
    TikTokIncome,
    /// Shopee income workbook (metadata banner above the header row)
    ShopeeIncome,
    /// Shopee weekly report PDF (daily totals only)
    ShopeeStatement,
}

/// How profit is computed for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfitBasis {
    /// `settlement - buy_price * quantity`
    Settlement,
    /// `(sell_price - buy_price) * quantity`
    UnitMargin,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::TikTokOrders => "tikTokOrders",
            SourceFormat::TikTokIncome => "tikTokIncome",
            SourceFormat::ShopeeIncome => "shopeeIncome",
            SourceFormat::ShopeeStatement => "shopeeStatement",
        }
    }

    /// Category given to products discovered by this source
    pub fn category(&self) -> &'static str {
        match self {
            SourceFormat::TikTokOrders => "TikTok Shop",
            SourceFormat::TikTokIncome => "TikTok Shop Income",
            SourceFormat::ShopeeIncome => "Shopee Income",
            SourceFormat::ShopeeStatement => "Shopee PDF",
        }
    }

    pub fn profit_basis(&self) -> ProfitBasis {
        match self {
            SourceFormat::TikTokOrders => ProfitBasis::UnitMargin,
            _ => ProfitBasis::Settlement,
        }
    }

    /// Whether quantity must be backed out of the settlement amount
    pub fn infers_quantity(&self) -> bool {
        !matches!(self, SourceFormat::TikTokOrders)
    }

    /// Return predicate of this export.
    ///
    /// The exports disagree on what a refund looks like, so each keeps its own rule.
    pub fn is_return(&self, amount: Decimal, refund_subtotal: Option<Decimal>) -> bool {
        match self {
            SourceFormat::TikTokOrders => amount < Decimal::ZERO,
            SourceFormat::TikTokIncome => {
                amount < Decimal::ZERO || refund_subtotal.is_some_and(|r| r < Decimal::ZERO)
            }
            SourceFormat::ShopeeIncome => amount <= Decimal::ZERO,
            SourceFormat::ShopeeStatement => false,
        }
    }
}

/// Canonical intermediate record between decoding and reconciliation.
///
/// Never persisted; created and consumed within a single import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEntry {
    pub source_order_id: String,
    /// Product key (case-insensitive)
    pub label: String,
    /// Net amount released to the seller for the whole entry
    pub settlement_amount: Decimal,
    pub quantity: u32,
    pub date: NaiveDate,
    pub variation: Option<String>,
    /// Buy price carried by the source itself, if any
    pub unit_cost: Option<Decimal>,
    /// Raw refund subtotal, kept for audit notes
    pub refund_subtotal: Option<Decimal>,
    pub sell_price: Decimal,
    pub is_return: bool,
    /// Quantity was estimated from the settlement amount
    pub quantity_inferred: bool,
}
