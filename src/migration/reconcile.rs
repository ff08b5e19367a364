//! Reconciliation of the catalog against recorded history
//!
//! Pure computation: no I/O, no mutation of either input.

use crate::migration::{Catalog, Migration, MigrationResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of comparing a catalog with the version table
#[derive(Clone, Default)]
pub struct Reconciliation {
    /// Catalog entries absent from history, ascending id
    pub missing: Vec<Arc<dyn Migration>>,
    /// History is not a clean prefix of the catalog
    pub dirty: bool,
    /// Missing ids at or below the highest applied id
    pub dirty_ids: Vec<i64>,
    /// Highest applied id (0 when history is empty)
    pub current_version: i64,
}

impl Reconciliation {
    pub fn missing_ids(&self) -> Vec<i64> {
        self.missing.iter().map(|m| m.id()).collect()
    }
}

impl std::fmt::Debug for Reconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciliation")
            .field("missing", &self.missing_ids())
            .field("dirty", &self.dirty)
            .field("dirty_ids", &self.dirty_ids)
            .field("current_version", &self.current_version)
            .finish()
    }
}

/// Compute which catalog entries still need applying and whether history has gaps
///
/// History is treated as a set. Dirty means some catalog id at or below the highest
/// applied id was never applied. History ids without a catalog entry do not count as
/// gaps.
pub fn reconcile(catalog: &Catalog, history: &[MigrationResult]) -> Reconciliation {
    let applied: HashSet<i64> = history.iter().map(|r| r.id).collect();
    let current_version = applied.iter().copied().max().unwrap_or(0);

    let missing: Vec<Arc<dyn Migration>> = catalog
        .iter()
        .filter(|m| !applied.contains(&m.id()))
        .cloned()
        .collect();

    let dirty_ids: Vec<i64> = missing
        .iter()
        .map(|m| m.id())
        .take_while(|&id| id <= current_version)
        .collect();

    Reconciliation {
        missing,
        dirty: !dirty_ids.is_empty(),
        dirty_ids,
        current_version,
    }
}

/// `(missing, dirty)` pair
pub fn find_missing(catalog: &Catalog, history: &[MigrationResult]) -> (Vec<Arc<dyn Migration>>, bool) {
    let r = reconcile(catalog, history);
    (r.missing, r.dirty)
}
