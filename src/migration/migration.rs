//! Migration trait definition

use super::schema_manager::SchemaManager;
use crate::executor::DbError;

/// A versioned, reversible change-unit
///
/// Implemented by [`SqlMigration`](super::SqlMigration) for files discovered on disk and by
/// application structs registered in a [`Registry`](super::Registry).
///
/// Ids order the catalog: within one catalog they must be unique and positive. Timestamps
/// (`YYYYMMDDHHMMSS`) and plain counters both work.
///
/// Both actions run inside the transaction that also writes the version table, so any
/// error returned here rolls back the action together with its history row.
pub trait Migration: Send + Sync {
    /// Get the migration id
    fn id(&self) -> i64;

    /// Get the migration name (descriptive only, never used for identity)
    fn name(&self) -> &str;

    /// Apply the migration (forward migration)
    ///
    /// # Errors
    ///
    /// Returns `DbError` if any statement fails.
    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;

    /// Revert the migration
    ///
    /// # Errors
    ///
    /// Returns `DbError` if any statement fails.
    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;
}
