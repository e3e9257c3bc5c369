//! Text extractor port - turns document bytes into plain text

use crate::domain::result::Result;

/// Extracts the text layer of a document (PDF statement)
///
/// Injected into the import service so the statement decoder stays pure.
pub trait TextExtractor: Send + Sync {
    /// Full document text, pages joined by newlines
    fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}
