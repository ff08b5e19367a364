//! Migration registry for in-process registration

use crate::migration::{Catalog, DiscoveryError, Migration};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Caller-owned set of migrations defined in code
///
/// Build one at startup, register every migration struct, then hand it to
/// [`MigrationSource::Registry`](super::MigrationSource::Registry). Its lifetime is the
/// caller's; nothing is kept in process-wide state.
///
/// # Example
///
/// ```rust
/// use lockstep::migration::{Migration, Registry, SchemaManager};
/// use lockstep::DbError;
///
/// struct CreateUsers;
///
/// impl Migration for CreateUsers {
///     fn id(&self) -> i64 { 1 }
///     fn name(&self) -> &str { "create_users" }
///     fn up(&self, m: &SchemaManager<'_>) -> Result<(), DbError> {
///         m.batch_execute("CREATE TABLE users (id BIGINT PRIMARY KEY)")
///     }
///     fn down(&self, m: &SchemaManager<'_>) -> Result<(), DbError> {
///         m.batch_execute("DROP TABLE users")
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.register(CreateUsers)?;
/// assert!(registry.contains(1));
/// # Ok::<(), lockstep::migration::DiscoveryError>(())
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    migrations: BTreeMap<i64, Arc<dyn Migration>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::AlreadyRegistered` if a migration with the same id is
    /// already registered (the name of the rejected migration is reported), and
    /// `DiscoveryError::InvalidId` for an id `<= 0`.
    pub fn register(&mut self, migration: impl Migration + 'static) -> Result<(), DiscoveryError> {
        self.register_arc(Arc::new(migration))
    }

    /// Register an already shared migration
    ///
    /// # Errors
    ///
    /// Same as [`Registry::register`].
    pub fn register_arc(&mut self, migration: Arc<dyn Migration>) -> Result<(), DiscoveryError> {
        let id = migration.id();
        if id <= 0 {
            return Err(DiscoveryError::InvalidId {
                id,
                name: migration.name().to_string(),
            });
        }
        if self.migrations.contains_key(&id) {
            return Err(DiscoveryError::AlreadyRegistered {
                id,
                name: migration.name().to_string(),
            });
        }

        log::debug!("Registered migration {} ({})", id, migration.name());
        self.migrations.insert(id, migration);
        Ok(())
    }

    /// Remove a migration; returns whether it was present
    pub fn unregister(&mut self, id: i64) -> bool {
        self.migrations.remove(&id).is_some()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.migrations.contains_key(&id)
    }

    /// Registered ids, ascending
    pub fn ids(&self) -> Vec<i64> {
        self.migrations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Snapshot of the registered migrations as a catalog
    ///
    /// # Errors
    ///
    /// Registration already enforces the catalog invariants, so this only fails if they
    /// were somehow bypassed.
    pub fn catalog(&self) -> Result<Catalog, DiscoveryError> {
        Catalog::new(self.migrations.values().cloned())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.migrations.iter().map(|(id, m)| (id, m.name())))
            .finish()
    }
}
