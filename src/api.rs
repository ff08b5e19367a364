//! Caller-facing entry points
//!
//! Each function builds the catalog from the configured source, builds a [`Migrator`]
//! for the configured dialect and version table, and delegates. The database handle
//! is borrowed for the call and left open.

use crate::config::MigrateConfig;
use crate::context::Context;
use crate::executor::Database;
use crate::migration::{MigrationError, MigrationResult, Migrator, UpError};

/// Apply all pending migrations; honours `config.force()`
///
/// # Errors
///
/// Returns `UpError` with the number of migrations committed before the failure.
pub fn up<D: Database>(ctx: &Context, db: &D, config: &MigrateConfig) -> Result<usize, UpError> {
    let catalog = config.source().catalog()?;
    Migrator::from_config(config).up(ctx, &catalog, db, config.force())
}

/// Revert the most recently applied migration; returns its id
///
/// # Errors
///
/// Returns `MigrationError` (see [`Migrator::down`]).
pub fn down<D: Database>(ctx: &Context, db: &D, config: &MigrateConfig) -> Result<i64, MigrationError> {
    let catalog = config.source().catalog()?;
    Migrator::from_config(config).down(ctx, &catalog, db)
}

/// Revert and re-apply the most recently applied migration; returns its id
///
/// # Errors
///
/// Returns `MigrationError` (see [`Migrator::redo`]).
pub fn redo<D: Database>(ctx: &Context, db: &D, config: &MigrateConfig) -> Result<i64, MigrationError> {
    let catalog = config.source().catalog()?;
    Migrator::from_config(config).redo(ctx, &catalog, db)
}

/// One entry per catalog migration, in catalog order
///
/// # Errors
///
/// Returns `MigrationError` if discovery fails or the version table cannot be read.
pub fn status<D: Database>(ctx: &Context, db: &D, config: &MigrateConfig) -> Result<Vec<MigrationResult>, MigrationError> {
    let catalog = config.source().catalog()?;
    Migrator::from_config(config).status(ctx, &catalog, db)
}

/// Highest applied id, 0 when nothing is applied
///
/// The catalog is not consulted.
///
/// # Errors
///
/// Returns `MigrationError::Persistence` if the version table cannot be read.
pub fn db_version<D: Database>(ctx: &Context, db: &D, config: &MigrateConfig) -> Result<i64, MigrationError> {
    Migrator::from_config(config).db_version(ctx, db)
}
