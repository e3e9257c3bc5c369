//! PDF text extraction

use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::ports::TextExtractor;

/// Reads the text layer of a PDF with `pdf-extract`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        if !bytes.starts_with(b"%PDF") {
            return Err(Error::source_format("not a PDF document"));
        }
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| Error::source_format(format!("unreadable PDF: {}", e)))?;
        debug!(chars = text.len(), "extracted PDF text");
        Ok(text)
    }
}
