//! Record normalization - decoded rows into normalized entries
//!
//! Row-level problems never abort the import. A required cell that is empty
//! skips the row; a cell that is present but unparseable falls back to a
//! default and leaves a warning. Every message carries the 1-based row number.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use super::headers::{Field, ResolvedHeader};
use super::statement_text::DailyAmount;
use super::tabular::{DecodedTable, RawRow};
use super::values::{parse_amount, parse_date, round_count, Cell, EMPTY_CELL};
use crate::config::ImportConfig;
use crate::domain::{NormalizedEntry, SourceFormat};

/// Entries plus the row errors and warnings met on the way
#[derive(Debug, Default)]
pub struct Normalized {
    pub entries: Vec<NormalizedEntry>,
    pub errors: Vec<String>,
}

/// Back quantity out of an aggregate settlement amount.
///
/// Returns the quantity and whether it was inferred. With a non-positive
/// `settlement_per_item` inference is skipped. When the estimate rounds to
/// zero the explicit quantity is used if positive, else 1.
pub fn infer_quantity(settlement: Decimal, explicit: Option<u32>, settlement_per_item: Decimal) -> (u32, bool) {
    if settlement_per_item > Decimal::ZERO {
        let estimate = round_count(settlement.abs() / settlement_per_item);
        if estimate >= 1 {
            return (estimate, true);
        }
    }
    match explicit {
        Some(q) if q >= 1 => (q, false),
        _ => (1, false),
    }
}

/// Quantity of an entry: backed out of the settlement for sources that
/// infer it, else the explicit quantity (1 when absent)
pub fn resolve_quantity(
    format: SourceFormat,
    settlement: Decimal,
    explicit: Option<u32>,
    config: &ImportConfig,
) -> (u32, bool) {
    if format.infers_quantity() {
        infer_quantity(settlement, explicit, config.settlement_per_item(format))
    } else {
        (explicit.filter(|q| *q >= 1).unwrap_or(1), false)
    }
}

/// Unit sell price; returns keep the raw amount, as does a zero quantity
pub fn derive_sell_price(amount: Decimal, quantity: u32, is_return: bool) -> Decimal {
    if is_return || quantity == 0 {
        amount
    } else {
        amount / Decimal::from(quantity)
    }
}

/// Label for rows without a product name: `Order <first 12 chars>...`
pub fn fallback_label(order_id: &str) -> String {
    let head: String = order_id.chars().take(12).collect();
    format!("Order {}...", head)
}

/// Apply return classification and the sale/return invariants to an entry
fn finish(mut entry: NormalizedEntry, format: SourceFormat) -> NormalizedEntry {
    entry.is_return = format.is_return(entry.settlement_amount, entry.refund_subtotal);
    if entry.is_return {
        entry.quantity = 0;
        entry.quantity_inferred = false;
    }
    entry.sell_price = derive_sell_price(entry.settlement_amount, entry.quantity, entry.is_return);
    entry
}

/// Cell access for one row, collecting warnings
struct RowReader<'a> {
    row: &'a RawRow,
    header: &'a ResolvedHeader,
    config: &'a ImportConfig,
    processing_date: NaiveDate,
    warnings: Vec<String>,
}

impl<'a> RowReader<'a> {
    fn new(row: &'a RawRow, header: &'a ResolvedHeader, config: &'a ImportConfig, processing_date: NaiveDate) -> Self {
        Self {
            row,
            header,
            config,
            processing_date,
            warnings: Vec::new(),
        }
    }

    fn cell(&self, field: Field) -> &'a Cell {
        match self.header.index(field) {
            Some(idx) => self.row.cell(idx),
            None => &EMPTY_CELL,
        }
    }

    fn text(&self, field: Field) -> Option<String> {
        self.cell(field).non_empty_text()
    }

    fn missing(&self, field: Field) -> String {
        format!("Row {}: missing {}", self.row.row_number, field)
    }

    /// Required amount: empty skips the row, unparseable reads as 0
    fn required_amount(&mut self, field: Field) -> Result<Decimal, String> {
        let cell = self.cell(field);
        if cell.is_empty() {
            return Err(self.missing(field));
        }
        Ok(self.lenient_amount(field).unwrap_or(Decimal::ZERO))
    }

    /// Required amount where an unparseable value also skips the row
    fn strict_amount(&self, field: Field) -> Result<Decimal, String> {
        let cell = self.cell(field);
        if cell.is_empty() {
            return Err(self.missing(field));
        }
        parse_amount(cell, self.config.decimal_separator).ok_or_else(|| {
            format!("Row {}: invalid {} '{}'", self.row.row_number, field, cell.as_text())
        })
    }

    /// Optional amount: empty is None, unparseable is 0 with a warning
    fn lenient_amount(&mut self, field: Field) -> Option<Decimal> {
        let cell = self.cell(field);
        if cell.is_empty() {
            return None;
        }
        match parse_amount(cell, self.config.decimal_separator) {
            Some(amount) => Some(amount),
            None => {
                self.warnings.push(format!(
                    "Row {}: unparseable {} '{}', using 0",
                    self.row.row_number,
                    field,
                    cell.as_text()
                ));
                Some(Decimal::ZERO)
            }
        }
    }

    fn count(&mut self, field: Field) -> Option<u32> {
        self.lenient_amount(field).map(round_count)
    }

    /// Line quantity of a sale: unparseable or below 1 reads as 1 with a warning.
    /// Returns keep whatever was there; they end with quantity 0 anyway.
    fn sale_quantity(&mut self, field: Field, is_return: bool) -> u32 {
        let cell = self.cell(field);
        let parsed = parse_amount(cell, self.config.decimal_separator).map(round_count);
        match parsed {
            Some(quantity) if quantity >= 1 => quantity,
            _ if is_return => 0,
            Some(_) => {
                self.warnings.push(format!(
                    "Row {}: {} '{}' below 1, using 1",
                    self.row.row_number,
                    field,
                    cell.as_text()
                ));
                1
            }
            None => {
                self.warnings.push(format!(
                    "Row {}: unparseable {} '{}', using 1",
                    self.row.row_number,
                    field,
                    cell.as_text()
                ));
                1
            }
        }
    }

    /// First parseable date among `fields`, else the processing date.
    ///
    /// A present but unparseable cell leaves a warning.
    fn date(&mut self, fields: &[Field]) -> NaiveDate {
        for field in fields {
            let cell = self.cell(*field);
            if cell.is_empty() {
                continue;
            }
            match parse_date(cell, self.config.date_system) {
                Some(date) => return date,
                None => self.warnings.push(format!(
                    "Row {}: unparseable {} '{}', using {}",
                    self.row.row_number,
                    field,
                    cell.as_text(),
                    self.processing_date
                )),
            }
        }
        self.processing_date
    }

    fn warn_missing_date(&mut self, field: Field) {
        if self.cell(field).is_empty() {
            self.warnings.push(format!(
                "Row {}: missing {}, using {}",
                self.row.row_number, field, self.processing_date
            ));
        }
    }
}

/// Normalize the rows of a decoded table for a given layout
pub fn normalize_table(
    format: SourceFormat,
    table: &DecodedTable,
    header: &ResolvedHeader,
    config: &ImportConfig,
    processing_date: NaiveDate,
) -> Normalized {
    let mut out = Normalized::default();

    for row in table.rows.iter().filter(|r| !r.is_blank()) {
        let mut reader = RowReader::new(row, header, config, processing_date);
        let result = match format {
            SourceFormat::TikTokOrders => tiktok_order_row(&mut reader),
            SourceFormat::TikTokIncome => tiktok_income_row(&mut reader),
            SourceFormat::ShopeeIncome => shopee_income_row(&mut reader),
            SourceFormat::ShopeeStatement => Err(format!(
                "Row {}: statement text has no rows",
                row.row_number
            )),
        };

        out.errors.append(&mut reader.warnings);
        match result {
            Ok(entry) => out.entries.push(finish(entry, format)),
            Err(e) => {
                warn!(error = %e, "skipping row");
                out.errors.push(e);
            }
        }
    }

    out
}

fn label_or_fallback(reader: &RowReader<'_>, order_id: &str) -> Result<String, String> {
    match reader.text(Field::ProductName) {
        Some(name) => Ok(name),
        None if !order_id.is_empty() => Ok(fallback_label(order_id)),
        None => Err(reader.missing(Field::ProductName)),
    }
}

/// TikTok order CSV: line-level quantity, order amount and unit cost
fn tiktok_order_row(reader: &mut RowReader<'_>) -> Result<NormalizedEntry, String> {
    let order_id = reader.text(Field::OrderId).unwrap_or_default();
    let label = label_or_fallback(reader, &order_id)?;
    if reader.cell(Field::Quantity).is_empty() {
        return Err(reader.missing(Field::Quantity));
    }
    let amount = reader.required_amount(Field::OrderAmount)?;
    let is_return = SourceFormat::TikTokOrders.is_return(amount, None);
    let quantity = reader.sale_quantity(Field::Quantity, is_return);
    let unit_cost = reader.lenient_amount(Field::UnitCost);
    let date = reader.date(&[Field::CreatedDate]);

    Ok(NormalizedEntry {
        source_order_id: order_id,
        label,
        settlement_amount: amount,
        quantity,
        date,
        variation: reader.text(Field::Variation),
        unit_cost,
        refund_subtotal: None,
        sell_price: Decimal::ZERO,
        is_return: false,
        quantity_inferred: false,
    })
}

/// TikTok income workbook: one settlement per order, quantity inferred
fn tiktok_income_row(reader: &mut RowReader<'_>) -> Result<NormalizedEntry, String> {
    let order_id = reader.text(Field::OrderId).unwrap_or_default();
    let label = label_or_fallback(reader, &order_id)?;

    // Total revenue stands in when the settlement cell is blank
    let settlement = match reader.required_amount(Field::SettlementAmount) {
        Ok(amount) => amount,
        Err(missing) => match reader.lenient_amount(Field::TotalRevenue) {
            Some(revenue) => {
                reader.warnings.push(format!(
                    "Row {}: missing settlement amount, using total revenue",
                    reader.row.row_number
                ));
                revenue
            }
            None => return Err(missing),
        },
    };

    let explicit = reader.count(Field::Quantity);
    let refund_subtotal = reader.lenient_amount(Field::RefundSubtotal);
    let date = reader.date(&[Field::SettledDate, Field::CreatedDate]);
    let (quantity, inferred) = resolve_quantity(SourceFormat::TikTokIncome, settlement, explicit, reader.config);

    Ok(NormalizedEntry {
        source_order_id: order_id,
        label,
        settlement_amount: settlement,
        quantity,
        date,
        variation: reader.text(Field::Variation),
        unit_cost: None,
        refund_subtotal,
        sell_price: Decimal::ZERO,
        is_return: false,
        quantity_inferred: inferred,
    })
}

/// Shopee income workbook: order id, release date and total income only
fn shopee_income_row(reader: &mut RowReader<'_>) -> Result<NormalizedEntry, String> {
    let order_id = reader.text(Field::OrderId).ok_or_else(|| reader.missing(Field::OrderId))?;
    let total = reader.strict_amount(Field::SettlementAmount)?;
    reader.warn_missing_date(Field::SettledDate);
    let date = reader.date(&[Field::SettledDate]);
    let (quantity, inferred) = resolve_quantity(SourceFormat::ShopeeIncome, total, None, reader.config);

    Ok(NormalizedEntry {
        label: format!("Shopee - {}", order_id),
        source_order_id: order_id,
        settlement_amount: total,
        quantity,
        date,
        variation: None,
        unit_cost: None,
        refund_subtotal: None,
        sell_price: Decimal::ZERO,
        is_return: false,
        quantity_inferred: inferred,
    })
}

/// Turn daily statement amounts into entries
pub fn normalize_statement(pairs: &[DailyAmount], config: &ImportConfig) -> Vec<NormalizedEntry> {
    pairs
        .iter()
        .map(|pair| {
            let (quantity, inferred) = resolve_quantity(SourceFormat::ShopeeStatement, pair.amount, None, config);
            let entry = NormalizedEntry {
                source_order_id: pair.order_id(),
                label: pair.label(),
                settlement_amount: pair.amount,
                quantity,
                date: pair.date,
                variation: None,
                unit_cost: None,
                refund_subtotal: None,
                sell_price: Decimal::ZERO,
                is_return: false,
                quantity_inferred: inferred,
            };
            finish(entry, SourceFormat::ShopeeStatement)
        })
        .collect()
}
