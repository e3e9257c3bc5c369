//! Tabular decoding - delimited text into rows of cells

use csv::ReaderBuilder;
use tracing::debug;

use super::values::{Cell, EMPTY_CELL};
use crate::domain::result::{Error, Result};

/// One data row, cells aligned with the table's column names
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based physical row (line) number in the source
    pub row_number: usize,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<Cell>) -> Self {
        Self { row_number, cells }
    }

    /// Cell at a column index; missing trailing cells read as empty
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// Header plus data rows
#[derive(Debug, Clone, Default)]
pub struct DecodedTable {
    /// Trimmed column names
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl DecodedTable {
    /// Build a table from a header row and the rows below it, dropping blank rows
    pub fn from_grid(header_index: usize, grid: &[Vec<Cell>]) -> Self {
        let columns = grid
            .get(header_index)
            .map(|row| row.iter().map(Cell::as_text).collect())
            .unwrap_or_default();

        let rows = grid
            .iter()
            .enumerate()
            .skip(header_index + 1)
            .map(|(idx, cells)| RawRow::new(idx + 1, cells.clone()))
            .filter(|row| !row.is_blank())
            .collect();

        Self { columns, rows }
    }
}

/// Pick the delimiter from the first line: `,` unless `;` or tab dominate
fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let count = |c: char| first.chars().filter(|x| *x == c).count();
    let (commas, semis, tabs) = (count(','), count(';'), count('\t'));
    if tabs > commas && tabs >= semis {
        b'\t'
    } else if semis > commas {
        b';'
    } else {
        b','
    }
}

/// Decode delimited text.
///
/// The first non-empty line is the header. Quoted fields may contain the
/// delimiter. Rows with a different field count are kept as is. Invalid
/// UTF-8 is replaced rather than rejected.
pub fn decode_delimited(bytes: &[u8]) -> Result<DecodedTable> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(Error::source_format("file is empty"));
    }

    let delimiter = sniff_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::source_format(format!("unreadable delimited text: {}", e)))?;
        let row_number = record.position().map(|p| p.line() as usize).unwrap_or(idx + 1);

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        match columns {
            None => columns = Some(record.iter().map(|f| f.trim().to_string()).collect()),
            Some(_) => {
                let cells = record.iter().map(Cell::text).collect();
                rows.push(RawRow::new(row_number, cells));
            }
        }
    }

    let columns = columns.ok_or_else(|| Error::source_format("header not found"))?;
    debug!(columns = columns.len(), rows = rows.len(), "decoded delimited text");
    Ok(DecodedTable { columns, rows })
}
