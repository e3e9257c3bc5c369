//! Migration service - schema migrations for the catalog database
//!
//! Migrations are embedded SQL files, each recorded in `sys_migrations`
//! once applied.

use anyhow::{Context, Result};
use duckdb::Connection;
use tracing::{debug, info};

use crate::migrations::MIGRATIONS;

const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Applies pending migrations on one connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Bootstrap `sys_migrations` if needed, then apply what is pending in order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.migrations_table_exists()? {
            let (name, sql) = MIGRATIONS
                .iter()
                .find(|(n, _)| *n == BOOTSTRAP)
                .context("bootstrap migration missing")?;
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        let done = self.get_applied()?;
        let already_applied = done.len() - applied.len();

        for (name, sql) in MIGRATIONS.iter().filter(|(n, _)| *n != BOOTSTRAP) {
            if !done.iter().any(|d| d == name) {
                self.apply(name, sql)?;
                applied.push(name.to_string());
            }
        }

        if !applied.is_empty() {
            info!(applied = ?applied, "applied migrations");
        }
        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        debug!(migration = name, "applying migration");
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("migration {} failed", name))?;
        self.conn
            .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        Ok(())
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Names of applied migrations, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Names of migrations not yet applied
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(MIGRATIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !applied.contains(name))
            .collect())
    }
}
