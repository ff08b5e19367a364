//! `MigrationResult` - one row of the version table, or one line of a status report

use crate::executor::DbError;
use crate::row::Row;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A migration as recorded in (or absent from) the version table
///
/// Rows read from the version table always carry `applied_at`. Status reports also
/// produce entries for catalog migrations that were never applied; those have
/// `applied_at == None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    /// Migration id
    pub id: i64,

    /// Name recorded when the migration was applied (catalog name when pending)
    pub name: String,

    /// When the migration was applied
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationResult {
    #[must_use]
    pub fn applied(id: i64, name: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            applied_at: Some(applied_at),
        }
    }

    #[must_use]
    pub fn pending(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            applied_at: None,
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }

    /// Create a `MigrationResult` from a history row
    ///
    /// Expected column order: `id`, `name`, `applied_at`
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if a column is missing or has the wrong type.
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            id: row.get_i64(0)?,
            name: row.get_string(1)?,
            applied_at: Some(row.get_timestamp(2)?),
        })
    }
}
