//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod catalog;
mod text_extractor;

pub use catalog::CatalogStore;
pub use text_extractor::TextExtractor;
