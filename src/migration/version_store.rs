//! Version table: the durable record of applied migrations
//!
//! One row per applied migration, keyed by id:
//!
//! | column       | type          |
//! |--------------|---------------|
//! | `id`         | `BIGINT` (PK) |
//! | `name`       | `VARCHAR(255)`|
//! | `applied_at` | `TIMESTAMPTZ` |
//!
//! Rows are inserted in the same transaction as a migration's `up` action and deleted in
//! the same transaction as its `down` action, so the table never shows a half-applied
//! migration.

use crate::dialect::Dialect;
use crate::executor::{DbError, SqlExecutor};
use crate::migration::{MigrationError, MigrationResult};
use crate::row::Value;
use chrono::{DateTime, Utc};
use std::fmt;

/// Version reported when no migration has been applied
pub const NO_VERSION: i64 = 0;

/// Maximum identifier length `PostgreSQL` keeps without truncation
const MAX_IDENT_LEN: usize = 63;

/// Schema-qualified location of the version table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTable {
    schema: String,
    table: String,
}

impl VersionTable {
    pub const DEFAULT_SCHEMA: &'static str = "public";
    pub const DEFAULT_TABLE: &'static str = "migrations";

    /// # Errors
    ///
    /// Returns `MigrationError::InvalidConfig` unless both names are plain identifiers
    /// (`[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes).
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self, MigrationError> {
        let schema = schema.into();
        let table = table.into();
        validate_identifier("schema name", &schema)?;
        validate_identifier("table name", &table)?;
        Ok(Self { schema, table })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self {
            schema: Self::DEFAULT_SCHEMA.to_string(),
            table: Self::DEFAULT_TABLE.to_string(),
        }
    }
}

impl fmt::Display for VersionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

fn validate_identifier(what: &str, ident: &str) -> Result<(), MigrationError> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest {
        return Err(MigrationError::InvalidConfig(format!(
            "{what} '{ident}' must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }
    if ident.len() > MAX_IDENT_LEN {
        return Err(MigrationError::InvalidConfig(format!(
            "{what} '{ident}' is longer than {MAX_IDENT_LEN} bytes"
        )));
    }
    Ok(())
}

/// Persistence contract the migrator relies on
///
/// Read operations take the connection; write operations take the caller's open
/// transaction so they commit or roll back together with the migration's action.
/// Every failure surfaces as `MigrationError::Persistence`.
pub trait VersionStore {
    /// Create the version table if it does not exist; safe to call on every run
    fn ensure_table(&self, executor: &dyn SqlExecutor) -> Result<(), MigrationError>;

    /// All recorded migrations; callers must not rely on the order
    fn read_history(&self, executor: &dyn SqlExecutor) -> Result<Vec<MigrationResult>, MigrationError>;

    /// Insert one history row inside `tx`
    fn record_applied(
        &self,
        tx: &dyn SqlExecutor,
        id: i64,
        name: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<(), MigrationError>;

    /// Delete one history row inside `tx`
    fn record_reverted(&self, tx: &dyn SqlExecutor, id: i64) -> Result<(), MigrationError>;

    /// Highest applied id, or [`NO_VERSION`] when nothing is applied
    fn current_version(&self, executor: &dyn SqlExecutor) -> Result<i64, MigrationError>;
}

/// Version store issuing the dialect's statements through any [`SqlExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlVersionStore {
    dialect: Dialect,
    table: VersionTable,
}

impl SqlVersionStore {
    #[must_use]
    pub fn new(dialect: Dialect, table: VersionTable) -> Self {
        Self { dialect, table }
    }

    pub fn table(&self) -> &VersionTable {
        &self.table
    }
}

impl VersionStore for SqlVersionStore {
    fn ensure_table(&self, executor: &dyn SqlExecutor) -> Result<(), MigrationError> {
        log::debug!("Ensuring version table {} exists", self.table);
        executor
            .batch_execute(&self.dialect.create_version_table(&self.table))
            .map_err(MigrationError::Persistence)
    }

    fn read_history(&self, executor: &dyn SqlExecutor) -> Result<Vec<MigrationResult>, MigrationError> {
        let rows = executor
            .query_all(&self.dialect.select_history(&self.table), &[])
            .map_err(MigrationError::Persistence)?;

        let history = rows
            .iter()
            .map(MigrationResult::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(MigrationError::Persistence)?;

        log::debug!("Read {} history row(s) from {}", history.len(), self.table);
        Ok(history)
    }

    fn record_applied(
        &self,
        tx: &dyn SqlExecutor,
        id: i64,
        name: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<(), MigrationError> {
        tx.execute(
            &self.dialect.insert_history_row(&self.table),
            &[Value::BigInt(id), Value::from(name), Value::Timestamp(applied_at)],
        )
        .map(|_| ())
        .map_err(MigrationError::Persistence)
    }

    fn record_reverted(&self, tx: &dyn SqlExecutor, id: i64) -> Result<(), MigrationError> {
        let deleted = tx
            .execute(&self.dialect.delete_history_row(&self.table), &[Value::BigInt(id)])
            .map_err(MigrationError::Persistence)?;

        if deleted == 0 {
            return Err(MigrationError::Persistence(DbError::Query(format!(
                "no history row for migration {id} in {}",
                self.table
            ))));
        }
        Ok(())
    }

    fn current_version(&self, executor: &dyn SqlExecutor) -> Result<i64, MigrationError> {
        let rows = executor
            .query_all(&self.dialect.select_max_id(&self.table), &[])
            .map_err(MigrationError::Persistence)?;

        match rows.first() {
            Some(row) => Ok(row
                .get_opt_i64(0)
                .map_err(MigrationError::Persistence)?
                .unwrap_or(NO_VERSION)),
            None => Ok(NO_VERSION),
        }
    }
}
