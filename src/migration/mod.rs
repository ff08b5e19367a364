//! Migration system for lockstep
//!
//! This module provides:
//! - the [`Migration`] trait and [`SchemaManager`] handed to migration actions
//! - catalog sources: SQL files on disk and in-code [`Registry`] registration
//! - the version table ([`VersionStore`], [`SqlVersionStore`])
//! - reconciliation of the catalog against history
//! - the [`Migrator`] that applies and reverts migrations transactionally
//!
//! # Example
//!
//! ```rust,no_run
//! use lockstep::migration::{Migration, SchemaManager};
//! use lockstep::DbError;
//! use sea_query::{ColumnDef, Table};
//!
//! pub struct CreateUsersTable;
//!
//! impl Migration for CreateUsersTable {
//!     fn id(&self) -> i64 {
//!         20240120120000
//!     }
//!
//!     fn name(&self) -> &str {
//!         "create_users_table"
//!     }
//!
//!     fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
//!         let table = Table::create()
//!             .table("users")
//!             .col(ColumnDef::new("id").big_integer().not_null().primary_key())
//!             .col(ColumnDef::new("email").string().not_null().unique_key())
//!             .to_owned();
//!         manager.create_table(table)
//!     }
//!
//!     fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
//!         manager.drop_table(Table::drop().table("users").to_owned())
//!     }
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod file;
pub mod migration;
pub mod migrator;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod schema_manager;
pub mod source;
pub mod startup;
pub mod status;
pub mod version_store;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::Catalog;
pub use error::{Direction, DiscoveryError, MigrationError, UpError};
pub use file::{create_sql_migration, discover_migrations, next_migration_id, SqlMigration};
pub use migration::Migration;
pub use migrator::Migrator;
pub use reconcile::{find_missing, reconcile, Reconciliation};
pub use record::MigrationResult;
pub use registry::Registry;
pub use schema_manager::SchemaManager;
pub use source::MigrationSource;
pub use startup::startup_migrations;
pub use status::MigrationStatus;
pub use version_store::{SqlVersionStore, VersionStore, VersionTable, NO_VERSION};
