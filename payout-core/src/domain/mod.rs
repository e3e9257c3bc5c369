//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod entry;
mod money;
mod product;
pub mod result;
mod transaction;

pub use entry::{NormalizedEntry, ProfitBasis, SourceFormat, SourceKind};
pub use money::format_rupiah;
pub use product::{name_key, Product};
pub use transaction::{Transaction, RETURN_MARKER};
