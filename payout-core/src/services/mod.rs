//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case.

pub mod import;
pub mod migration;
pub mod stats;

pub use import::{ImportReport, ImportService, ImportStage, ImportStats};
pub use migration::{MigrationResult, MigrationService};
pub use stats::{DashboardStats, Platform, ProductTotal, StatsService};
