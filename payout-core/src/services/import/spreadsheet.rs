//! Spreadsheet decoding - workbook bytes into cell grids, sheet choice and header scan

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use super::headers::HeaderSignature;
use super::values::Cell;
use crate::domain::result::{Error, Result};

/// One worksheet as a grid of cells, row 0 being the first physical row
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { name: name.into(), rows }
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // as_datetime applies the workbook's own epoch (1900 or 1904)
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Cell::Date(datetime.date()),
            None => Cell::Number(dt.as_f64()),
        },
    }
}

/// Read every sheet of a workbook (xlsx, xlsm, xlsb, xls, ods)
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Sheet>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::source_format(format!("unreadable workbook: {}", e)))?;

    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());

    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| Error::source_format(format!("unreadable sheet '{}': {}", name, e)))?;

        // Keep physical row numbers when the used range starts below row 1
        let offset = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); offset];
        rows.extend(range.rows().map(|r| r.iter().map(to_cell).collect()));

        debug!(sheet = %name, rows = rows.len(), "read worksheet");
        sheets.push(Sheet::new(name, rows));
    }

    if sheets.is_empty() {
        return Err(Error::source_format("workbook has no sheets"));
    }
    Ok(sheets)
}

/// Choose the sheet holding order data.
///
/// Prefers a name containing "income", or both "order" and "detail";
/// otherwise the first sheet.
pub fn preferred_sheet(sheets: &[Sheet]) -> Option<&Sheet> {
    sheets
        .iter()
        .find(|s| {
            let lower = s.name.to_lowercase();
            lower.contains("income") || (lower.contains("order") && lower.contains("detail"))
        })
        .or_else(|| sheets.first())
}

/// Row text as the header scan sees it: trimmed cells joined with `|`
pub fn row_text(row: &[Cell]) -> String {
    row.iter().map(Cell::as_text).collect::<Vec<_>>().join("|")
}

/// Find the first of `scan_rows` rows carrying the signature (0-based index).
///
/// The error lists the scanned rows so the user can see what was there.
pub fn find_header_row(rows: &[Vec<Cell>], signature: &HeaderSignature, scan_rows: usize) -> Result<usize> {
    let scanned = &rows[..rows.len().min(scan_rows)];
    if let Some(idx) = scanned.iter().position(|r| signature.matches(&row_text(r))) {
        return Ok(idx);
    }

    let preview: Vec<String> = scanned
        .iter()
        .enumerate()
        .filter(|(_, r)| r.iter().any(|c| !c.is_empty()))
        .map(|(i, r)| format!("row {}: {}", i + 1, row_text(r)))
        .collect();

    Err(Error::source_format(format!(
        "header not found in first {} rows (looking for {} and one of {}); scanned: [{}]",
        scan_rows,
        signature.all.join(", "),
        signature.any.join("/"),
        preview.join("; ")
    )))
}
