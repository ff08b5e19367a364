//! Where a run's catalog comes from

use crate::migration::{discover_migrations, Catalog, MigrationError, Registry};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Producer of the catalog, resolved once when the configuration is built
#[derive(Clone)]
pub enum MigrationSource {
    /// `<id>_<name>.sql` files in a directory, rescanned on every call
    Directory(PathBuf),
    /// Migrations registered in code
    Registry(Arc<Registry>),
}

impl MigrationSource {
    /// Assemble the catalog for one run
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Discovery` if the directory cannot be scanned or holds
    /// invalid or colliding migrations.
    pub fn catalog(&self) -> Result<Catalog, MigrationError> {
        let catalog = match self {
            MigrationSource::Directory(dir) => discover_migrations(dir)?,
            MigrationSource::Registry(registry) => registry.catalog()?,
        };
        Ok(catalog)
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationSource::Directory(_) => "sql",
            MigrationSource::Registry(_) => "registry",
        }
    }
}

impl Default for MigrationSource {
    fn default() -> Self {
        MigrationSource::Directory(PathBuf::from("."))
    }
}

impl fmt::Debug for MigrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationSource::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            MigrationSource::Registry(registry) => {
                f.debug_tuple("Registry").field(&registry.ids()).finish()
            }
        }
    }
}

impl From<Registry> for MigrationSource {
    fn from(registry: Registry) -> Self {
        MigrationSource::Registry(Arc::new(registry))
    }
}

impl From<PathBuf> for MigrationSource {
    fn from(dir: PathBuf) -> Self {
        MigrationSource::Directory(dir)
    }
}
