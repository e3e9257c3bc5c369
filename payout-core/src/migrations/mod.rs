//! Database migrations - embedded SQL files
//!
//! Each migration is a tuple of (name, sql_content), compiled in with
//! include_str! and applied in order.

/// All migrations, in application order.
///
/// New migrations get the next NNN_description.sql name and an entry here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_catalog_schema.sql", include_str!("001_catalog_schema.sql")),
    ("002_import_batches.sql", include_str!("002_import_batches.sql")),
];
