//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the CatalogStore port
//! - An in-memory CatalogStore for tests and previews
//! - pdf-extract for the TextExtractor port

pub mod duckdb;
pub mod memory;
pub mod pdf;
