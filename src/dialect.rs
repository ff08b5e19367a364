//! SQL dialects
//!
//! The dialect is resolved once, when the configuration is built, and from then on the
//! migrator only asks it for statement text. Adding a database means adding a variant
//! here and a backend implementing [`Database`](crate::Database).

use crate::migration::MigrationError;
use crate::migration::VersionTable;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Dialect {
    /// `PostgreSQL` (and wire-compatible servers)
    #[default]
    Postgres,
}

impl Dialect {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
        }
    }

    /// Double-quoted, schema-qualified table name
    #[must_use]
    pub fn qualified_table(self, table: &VersionTable) -> String {
        match self {
            Dialect::Postgres => format!(
                "{}.{}",
                quote_ident(table.schema()),
                quote_ident(table.table())
            ),
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` for the version table
    #[must_use]
    pub fn create_version_table(self, table: &VersionTable) -> String {
        match self {
            Dialect::Postgres => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                 id BIGINT PRIMARY KEY,\n    \
                 name VARCHAR(255) NOT NULL,\n    \
                 applied_at TIMESTAMPTZ NOT NULL\n)",
                self.qualified_table(table)
            ),
        }
    }

    /// Insert one history row; binds `(id, name, applied_at)`
    #[must_use]
    pub fn insert_history_row(self, table: &VersionTable) -> String {
        match self {
            Dialect::Postgres => format!(
                "INSERT INTO {} (id, name, applied_at) VALUES ($1, $2, $3)",
                self.qualified_table(table)
            ),
        }
    }

    /// Delete one history row; binds `(id)`
    #[must_use]
    pub fn delete_history_row(self, table: &VersionTable) -> String {
        match self {
            Dialect::Postgres => format!(
                "DELETE FROM {} WHERE id = $1",
                self.qualified_table(table)
            ),
        }
    }

    /// Every history row as `(id, name, applied_at)`, ascending id
    #[must_use]
    pub fn select_history(self, table: &VersionTable) -> String {
        match self {
            Dialect::Postgres => format!(
                "SELECT id, name, applied_at FROM {} ORDER BY id ASC",
                self.qualified_table(table)
            ),
        }
    }

    /// Highest applied id; `NULL` when the table is empty
    #[must_use]
    pub fn select_max_id(self, table: &VersionTable) -> String {
        match self {
            Dialect::Postgres => format!("SELECT MAX(id) FROM {}", self.qualified_table(table)),
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            _ => Err(MigrationError::DialectUnsupported(s.to_string())),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = MigrationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
