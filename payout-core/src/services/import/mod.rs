//! Import service - settlement reports into catalog updates
//!
//! The pipeline is pure: bytes in, an [`ImportReport`] out. Decoding picks the
//! layout, normalization turns rows into entries, and reconciliation merges
//! them into the caller's product list. Persisting the result is left to the
//! caller.

pub mod headers;
pub mod normalize;
pub mod reconcile;
pub mod spreadsheet;
pub mod statement_text;
pub mod tabular;
pub mod values;

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{NormalizedEntry, Product, SourceFormat, SourceKind, Transaction};
use crate::ports::TextExtractor;

use headers::{missing_required, resolve, resolve_required, ResolvedHeader, SHOPEE_HEADER, SHOPEE_INCOME, TIKTOK_INCOME, TIKTOK_ORDERS};
use normalize::{normalize_statement, normalize_table, Normalized};
use spreadsheet::{find_header_row, preferred_sheet, read_workbook, Sheet};
use statement_text::scan_statement;
use tabular::{decode_delimited, DecodedTable};

pub use reconcile::{reconcile, ImportStats, Reconciled};

/// Pipeline stage reached by an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStage {
    Decoding,
    HeaderResolved,
    Normalizing,
    Reconciling,
    Done,
    Failed,
}

/// Result of one import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Full updated product list (existing first, then new)
    pub products: Vec<Product>,
    /// New transactions, one per entry
    pub transactions: Vec<Transaction>,
    pub stats: ImportStats,
    /// Source-format errors, row errors and warnings, in order
    pub errors: Vec<String>,
    pub stage: ImportStage,
    /// Stage that failed, when `stage` is `Failed`
    pub failed_at: Option<ImportStage>,
    /// Detected export layout
    pub format: Option<SourceFormat>,
    pub batch_id: String,
    /// SHA-256 of the input bytes, hex encoded
    pub checksum: String,
}

impl ImportReport {
    fn new(bytes: &[u8]) -> Self {
        Self {
            products: Vec::new(),
            transactions: Vec::new(),
            stats: ImportStats::default(),
            errors: Vec::new(),
            stage: ImportStage::Decoding,
            failed_at: None,
            format: None,
            batch_id: new_batch_id(),
            checksum: hex::encode(Sha256::digest(bytes)),
        }
    }

    fn fail(mut self, error: Option<String>) -> Self {
        if let Some(error) = error {
            self.errors.push(error);
        }
        warn!(stage = ?self.stage, errors = self.errors.len(), "import failed");
        self.failed_at = Some(self.stage);
        self.stage = ImportStage::Failed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.stage == ImportStage::Done
    }
}

/// `import_YYYYmmdd_HHMMSS_<8 hex>`; the suffix keeps imports within one second apart
fn new_batch_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("import_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Table, layout and resolved header of a decoded spreadsheet
#[derive(Debug)]
pub struct DetectedTable {
    pub format: SourceFormat,
    pub table: DecodedTable,
    pub header: ResolvedHeader,
}

/// Pick the layout of a workbook and cut out its table.
///
/// A Shopee header below a metadata banner is searched first, within
/// `header_scan_rows`. Otherwise the first row must be a TikTok income header.
pub fn detect_sheet_layout(sheets: &[Sheet], config: &ImportConfig) -> Result<DetectedTable> {
    let sheet = preferred_sheet(sheets).ok_or_else(|| Error::source_format("workbook has no sheets"))?;
    debug!(sheet = %sheet.name, "selected worksheet");

    if let Ok(header_index) = find_header_row(&sheet.rows, &SHOPEE_HEADER, config.header_scan_rows) {
        let table = DecodedTable::from_grid(header_index, &sheet.rows);
        let header = resolve_required(&table.columns, &SHOPEE_INCOME)?;
        debug!(header_row = header_index + 1, "detected Shopee income layout");
        return Ok(DetectedTable {
            format: SourceFormat::ShopeeIncome,
            table,
            header,
        });
    }

    let table = DecodedTable::from_grid(0, &sheet.rows);
    let header = resolve(&table.columns, &TIKTOK_INCOME);
    if missing_required(&header, &TIKTOK_INCOME).is_empty() {
        return Ok(DetectedTable {
            format: SourceFormat::TikTokIncome,
            table,
            header,
        });
    }

    // Neither layout matched: report both
    let shopee_err = find_header_row(&sheet.rows, &SHOPEE_HEADER, config.header_scan_rows)
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
    let tiktok_err = resolve_required(&table.columns, &TIKTOK_INCOME)
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
    Err(Error::source_format(format!(
        "unrecognized workbook layout in sheet '{}': TikTok income {}; Shopee income {}",
        sheet.name,
        tiktok_err.trim_start_matches("Source format error: "),
        shopee_err.trim_start_matches("Source format error: "),
    )))
}

/// Decoded entries before reconciliation
struct Decoded {
    format: SourceFormat,
    normalized: Normalized,
}

/// Runs the import pipeline
pub struct ImportService {
    extractor: Arc<dyn TextExtractor>,
}

impl ImportService {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// Import a file using today's date for rows without one
    pub fn import_file(
        &self,
        bytes: &[u8],
        kind: SourceKind,
        existing: &[Product],
        config: &ImportConfig,
    ) -> ImportReport {
        self.import_file_on(bytes, kind, existing, config, Local::now().date_naive())
    }

    /// Import a file with an explicit processing date.
    ///
    /// Never fails: problems land in `errors`, and a file yielding no
    /// entries ends in the `Failed` stage.
    pub fn import_file_on(
        &self,
        bytes: &[u8],
        kind: SourceKind,
        existing: &[Product],
        config: &ImportConfig,
        processing_date: NaiveDate,
    ) -> ImportReport {
        let mut report = ImportReport::new(bytes);
        debug!(kind = %kind, bytes = bytes.len(), batch_id = %report.batch_id, "starting import");

        let decoded = match self.decode(bytes, kind, config, processing_date, &mut report) {
            Ok(decoded) => decoded,
            Err(e) => return report.fail(Some(e.to_string())),
        };

        report.format = Some(decoded.format);
        report.errors.extend(decoded.normalized.errors);
        let entries: Vec<NormalizedEntry> = decoded.normalized.entries;

        if entries.is_empty() {
            return report.fail(Some("no importable rows found".to_string()));
        }

        report.stage = ImportStage::Reconciling;
        let Reconciled {
            products,
            transactions,
            stats,
        } = reconcile(&entries, existing, decoded.format, config);

        if stats.inferred_quantities > 0 {
            report.errors.push(format!(
                "{} quantities estimated from settlement amounts",
                stats.inferred_quantities
            ));
        }

        report.products = products;
        report.transactions = transactions;
        report.stats = stats;
        report.stage = ImportStage::Done;

        info!(
            batch_id = %report.batch_id,
            format = ?decoded.format,
            new_products = report.stats.new_products,
            new_transactions = report.stats.new_transactions,
            returns = report.stats.returns,
            total_profit = %report.stats.total_profit,
            errors = report.errors.len(),
            "import complete"
        );
        report
    }

    fn decode(
        &self,
        bytes: &[u8],
        kind: SourceKind,
        config: &ImportConfig,
        processing_date: NaiveDate,
        report: &mut ImportReport,
    ) -> Result<Decoded> {
        match kind {
            SourceKind::TabularText => {
                let table = decode_delimited(bytes)?;
                report.stage = ImportStage::HeaderResolved;
                let header = resolve_required(&table.columns, &TIKTOK_ORDERS)?;
                report.stage = ImportStage::Normalizing;
                let normalized = normalize_table(SourceFormat::TikTokOrders, &table, &header, config, processing_date);
                Ok(Decoded {
                    format: SourceFormat::TikTokOrders,
                    normalized,
                })
            }
            SourceKind::Spreadsheet => {
                let sheets = read_workbook(bytes)?;
                report.stage = ImportStage::HeaderResolved;
                let detected = detect_sheet_layout(&sheets, config)?;
                report.stage = ImportStage::Normalizing;
                let normalized =
                    normalize_table(detected.format, &detected.table, &detected.header, config, processing_date);
                Ok(Decoded {
                    format: detected.format,
                    normalized,
                })
            }
            SourceKind::UnstructuredText => {
                let text = self.extractor.extract_text(bytes)?;
                let scan = scan_statement(&text, config.max_daily_amount);
                report.stage = ImportStage::Normalizing;
                Ok(Decoded {
                    format: SourceFormat::ShopeeStatement,
                    normalized: Normalized {
                        entries: normalize_statement(&scan.pairs, config),
                        errors: scan.errors,
                    },
                })
            }
        }
    }
}
