//! Migrator - Core migration execution engine
//!
//! Every run follows the same path: ensure the version table, read history, reconcile
//! it against the catalog, then work through the resulting list one migration at a
//! time. Each migration's action and its version-table write share one transaction;
//! a failure rolls back only that migration and stops the run.

use crate::config::MigrateConfig;
use crate::context::Context;
use crate::dialect::Dialect;
use crate::executor::{Database, DbError, SqlExecutor, Transaction};
use crate::migration::{
    reconcile, Catalog, Direction, Migration, MigrationError, MigrationResult, Reconciliation,
    SchemaManager, SqlVersionStore, UpError, VersionStore, NO_VERSION,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// Core migration execution engine
///
/// Generic over the [`VersionStore`] so the engine can be driven against any
/// persistence; production code uses [`SqlVersionStore`].
#[derive(Debug, Clone)]
pub struct Migrator<S = SqlVersionStore> {
    dialect: Dialect,
    store: S,
}

impl Migrator<SqlVersionStore> {
    /// Migrator for the configured dialect and version table
    #[must_use]
    pub fn from_config(config: &MigrateConfig) -> Self {
        let store = SqlVersionStore::new(config.dialect(), config.version_table().clone());
        Self::new(config.dialect(), store)
    }
}

impl<S: VersionStore> Migrator<S> {
    pub fn new(dialect: Dialect, store: S) -> Self {
        Self { dialect, store }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply every catalog migration missing from history, in ascending id order
    ///
    /// Dirty history (a catalog id below the current version that was never applied)
    /// blocks the run before anything executes unless `force` is set; with `force` the
    /// gaps are applied along with everything else.
    ///
    /// # Returns
    ///
    /// The number of migrations applied (0 when already up to date).
    ///
    /// # Errors
    ///
    /// Returns `UpError` carrying the number of migrations committed before the failure.
    /// Those migrations stay applied.
    pub fn up<D: Database>(
        &self,
        ctx: &Context,
        catalog: &Catalog,
        db: &D,
        force: bool,
    ) -> Result<usize, UpError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::run_span("up").entered();

        let plan = self.plan(ctx, catalog, db)?;

        if plan.dirty {
            if !force {
                return Err(MigrationError::DirtyMigrations {
                    ids: plan.dirty_ids,
                    current_version: plan.current_version,
                }
                .into());
            }
            log::warn!(
                "Applying migrations {:?} below current version {} (forced)",
                plan.dirty_ids,
                plan.current_version
            );
        }

        if plan.missing.is_empty() {
            log::info!("Database is up to date at version {}", plan.current_version);
            return Ok(0);
        }

        let mut applied = 0;
        for migration in &plan.missing {
            ctx.check().map_err(|e| UpError::new(applied, e))?;
            self.run_in_transaction(db, migration.as_ref(), Direction::Up)
                .map_err(|e| UpError::new(applied, e))?;
            applied += 1;
        }

        log::info!("Applied {} migration(s)", applied);
        Ok(applied)
    }

    /// Revert the most recently applied migration
    ///
    /// # Returns
    ///
    /// The id of the reverted migration.
    ///
    /// # Errors
    ///
    /// - `NothingToRevert` when no migration is applied
    /// - `HistoryMismatch` when the current version has no catalog entry
    /// - `ExecutionFailed` when the down action fails (nothing is reverted)
    pub fn down<D: Database>(&self, ctx: &Context, catalog: &Catalog, db: &D) -> Result<i64, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::run_span("down").entered();

        let migration = self.latest_applied(ctx, catalog, db)?;
        ctx.check()?;
        self.run_in_transaction(db, migration.as_ref(), Direction::Down)?;
        Ok(migration.id())
    }

    /// Revert the most recently applied migration, then apply it again
    ///
    /// If the revert commits but the re-apply fails, the migration is left reverted and
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// Same as [`Migrator::down`], plus `ExecutionFailed` for the re-apply.
    pub fn redo<D: Database>(&self, ctx: &Context, catalog: &Catalog, db: &D) -> Result<i64, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::run_span("redo").entered();

        let migration = self.latest_applied(ctx, catalog, db)?;

        ctx.check()?;
        self.run_in_transaction(db, migration.as_ref(), Direction::Down)?;

        ctx.check()?;
        if let Err(e) = self.run_in_transaction(db, migration.as_ref(), Direction::Up) {
            log::warn!(
                "Migration {} ({}) was reverted but could not be re-applied",
                migration.id(),
                migration.name()
            );
            return Err(e);
        }
        Ok(migration.id())
    }

    /// One entry per catalog migration, in catalog order
    ///
    /// Applied entries carry the name and timestamp recorded in the version table;
    /// pending entries carry the catalog name and no timestamp.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the version table cannot be created or read.
    pub fn status(
        &self,
        ctx: &Context,
        catalog: &Catalog,
        db: &dyn SqlExecutor,
    ) -> Result<Vec<MigrationResult>, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::run_span("status").entered();

        let history = self.history(ctx, db)?;
        let by_id: HashMap<i64, &MigrationResult> = history.iter().map(|r| (r.id, r)).collect();

        Ok(catalog
            .iter()
            .map(|m| match by_id.get(&m.id()) {
                Some(record) => (*record).clone(),
                None => MigrationResult::pending(m.id(), m.name()),
            })
            .collect())
    }

    /// Highest applied id, or 0 when nothing is applied
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the version table cannot be created or read.
    pub fn db_version(&self, ctx: &Context, db: &dyn SqlExecutor) -> Result<i64, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::run_span("dbversion").entered();

        self.ensure_table(ctx, db)?;
        ctx.check()?;
        self.store.current_version(db)
    }

    fn ensure_table(&self, ctx: &Context, db: &dyn SqlExecutor) -> Result<(), MigrationError> {
        ctx.check()?;
        self.store.ensure_table(db)
    }

    fn history(&self, ctx: &Context, db: &dyn SqlExecutor) -> Result<Vec<MigrationResult>, MigrationError> {
        self.ensure_table(ctx, db)?;
        ctx.check()?;
        self.store.read_history(db)
    }

    fn plan(&self, ctx: &Context, catalog: &Catalog, db: &dyn SqlExecutor) -> Result<Reconciliation, MigrationError> {
        let history = self.history(ctx, db)?;
        let plan = reconcile(catalog, &history);
        log::debug!(
            "Version {}: {} of {} migration(s) pending",
            plan.current_version,
            plan.missing.len(),
            catalog.len()
        );
        Ok(plan)
    }

    fn latest_applied(
        &self,
        ctx: &Context,
        catalog: &Catalog,
        db: &dyn SqlExecutor,
    ) -> Result<Arc<dyn Migration>, MigrationError> {
        self.ensure_table(ctx, db)?;
        ctx.check()?;

        let version = self.store.current_version(db)?;
        if version == NO_VERSION {
            return Err(MigrationError::NothingToRevert);
        }
        catalog
            .get(version)
            .cloned()
            .ok_or(MigrationError::HistoryMismatch { id: version })
    }

    /// Run one migration's action and its history write in a single transaction
    fn run_in_transaction<D: Database>(
        &self,
        db: &D,
        migration: &dyn Migration,
        direction: Direction,
    ) -> Result<(), MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::migration_span(migration.id(), migration.name(), direction.as_str())
            .entered();

        let failed = |source: DbError| MigrationError::ExecutionFailed {
            id: migration.id(),
            name: migration.name().to_string(),
            direction,
            source,
        };

        let started = Instant::now();
        let tx = db.begin().map_err(failed)?;

        if let Err(e) = self.act(&tx, migration, direction) {
            if let Err(rollback_err) = tx.rollback() {
                log::warn!(
                    "Rollback of migration {} ({}) failed: {}",
                    migration.id(),
                    migration.name(),
                    rollback_err
                );
            }
            log::error!(
                "Migration {} ({}) failed during {}: {}",
                migration.id(),
                migration.name(),
                direction,
                e
            );
            return Err(e);
        }
        tx.commit().map_err(failed)?;

        log::info!(
            "{} migration {} ({}) in {:?}",
            match direction {
                Direction::Up => "Applied",
                Direction::Down => "Reverted",
            },
            migration.id(),
            migration.name(),
            started.elapsed()
        );
        Ok(())
    }

    fn act(&self, tx: &dyn SqlExecutor, migration: &dyn Migration, direction: Direction) -> Result<(), MigrationError> {
        let manager = SchemaManager::new(tx, self.dialect);
        let failed = |source: DbError| MigrationError::ExecutionFailed {
            id: migration.id(),
            name: migration.name().to_string(),
            direction,
            source,
        };

        match direction {
            Direction::Up => {
                migration.up(&manager).map_err(failed)?;
                self.store
                    .record_applied(tx, migration.id(), migration.name(), Utc::now())
            }
            Direction::Down => {
                migration.down(&manager).map_err(failed)?;
                self.store.record_reverted(tx, migration.id())
            }
        }
    }
}
