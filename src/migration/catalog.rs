//! The ordered set of migrations known for one run

use crate::migration::{DiscoveryError, Migration};
use std::fmt;
use std::sync::Arc;

/// Migrations sorted by ascending id, ids unique and positive
///
/// A catalog is assembled once per run (from a directory or a [`Registry`](super::Registry))
/// and never mutated by the migrator.
#[derive(Clone, Default)]
pub struct Catalog {
    migrations: Vec<Arc<dyn Migration>>,
}

impl Catalog {
    /// Build a catalog from migrations in any order
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidId` for an id `<= 0` and `DiscoveryError::DuplicateId`
    /// when two migrations share an id.
    pub fn new(migrations: impl IntoIterator<Item = Arc<dyn Migration>>) -> Result<Self, DiscoveryError> {
        let mut migrations: Vec<Arc<dyn Migration>> = migrations.into_iter().collect();

        if let Some(bad) = migrations.iter().find(|m| m.id() <= 0) {
            return Err(DiscoveryError::InvalidId {
                id: bad.id(),
                name: bad.name().to_string(),
            });
        }

        migrations.sort_by_key(|m| m.id());

        if let Some(pair) = migrations.windows(2).find(|w| w[0].id() == w[1].id()) {
            return Err(DiscoveryError::DuplicateId {
                id: pair[0].id(),
                first: pair[0].name().to_string(),
                second: pair[1].name().to_string(),
            });
        }

        Ok(Self { migrations })
    }

    /// Empty catalog
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Find a migration by id
    pub fn get(&self, id: i64) -> Option<&Arc<dyn Migration>> {
        self.migrations
            .binary_search_by_key(&id, |m| m.id())
            .ok()
            .map(|idx| &self.migrations[idx])
    }

    /// Iterate in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Migration>> {
        self.migrations.iter()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.migrations.iter().map(|m| m.id()).collect()
    }

    /// Highest id in the catalog
    pub fn last_id(&self) -> Option<i64> {
        self.migrations.last().map(|m| m.id())
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.migrations.iter().map(|m| (m.id(), m.name())))
            .finish()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Arc<dyn Migration>;
    type IntoIter = std::slice::Iter<'a, Arc<dyn Migration>>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}
