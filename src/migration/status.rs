//! Migration status summary

use crate::migration::MigrationResult;
use serde::Serialize;

/// Applied and pending migrations split out of a status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Applied migrations (from the version table)
    pub applied: Vec<MigrationResult>,

    /// Pending migrations (catalog entries never applied)
    pub pending: Vec<MigrationResult>,
}

impl MigrationStatus {
    /// Split a per-catalog-entry report, keeping catalog order within each half
    #[must_use]
    pub fn new(report: Vec<MigrationResult>) -> Self {
        let (applied, pending) = report.into_iter().partition(MigrationResult::is_applied);
        Self { applied, pending }
    }

    pub fn total(&self) -> usize {
        self.applied.len() + self.pending.len()
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the latest applied migration id
    #[must_use]
    pub fn latest_applied_id(&self) -> Option<i64> {
        self.applied.iter().map(|m| m.id).max()
    }

    /// Get the next pending migration id
    #[must_use]
    pub fn next_pending_id(&self) -> Option<i64> {
        self.pending.first().map(|m| m.id)
    }

    /// Pending ids below the latest applied id (what `up` would refuse without force)
    pub fn gaps(&self) -> Vec<i64> {
        let latest = self.latest_applied_id().unwrap_or(0);
        self.pending
            .iter()
            .map(|m| m.id)
            .filter(|&id| id < latest)
            .collect()
    }
}
