//! Migration-specific error types

use crate::executor::DbError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which action of a migration was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Apply the migration (up)
    Up,
    /// Revert the migration (down)
    Down,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while assembling a catalog from a directory or a registry
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Directory or file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Migration directory does not exist or is not a directory
    #[error("migration directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// `.sql` file whose name is not `<id>_<name>.sql`
    #[error("migration file name '{}' does not match expected pattern <id>_<name>.sql", .0.display())]
    InvalidFileName(PathBuf),
    /// File contents could not be parsed
    #[error("invalid migration file {}: {reason}", path.display())]
    InvalidFormat { path: PathBuf, reason: String },
    /// Ids must be positive
    #[error("invalid migration id {id} for '{name}': ids must be positive")]
    InvalidId { id: i64, name: String },
    /// Two catalog entries share an id
    #[error("duplicate migration id {id}: '{first}' and '{second}'")]
    DuplicateId {
        id: i64,
        first: String,
        second: String,
    },
    /// A registry already holds a migration with this id
    #[error("migration '{name}' (id {id}) is already registered")]
    AlreadyRegistered { id: i64, name: String },
}

/// Errors surfaced by the migrator and the façade functions
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Unknown dialect requested; raised before any I/O
    #[error("unsupported dialect '{0}'")]
    DialectUnsupported(String),

    /// Configuration rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The catalog could not be assembled
    #[error("migration discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// History is not a clean prefix of the catalog
    #[error(
        "dirty migrations detected: {ids:?} are not applied but the database is at version \
         {current_version}; use force to apply them anyway"
    )]
    DirtyMigrations { ids: Vec<i64>, current_version: i64 },

    /// A migration's action (or its version-table write) failed; its transaction was rolled back
    #[error("migration '{name}' (id {id}) failed during {direction}: {source}")]
    ExecutionFailed {
        id: i64,
        name: String,
        direction: Direction,
        #[source]
        source: DbError,
    },

    /// The current version has no catalog entry
    #[error("migration {id} is recorded as applied but is not present in the catalog")]
    HistoryMismatch { id: i64 },

    /// Down/Redo with nothing applied
    #[error("no applied migrations to revert")]
    NothingToRevert,

    /// Version table could not be created, read or written
    #[error("version table error: {0}")]
    Persistence(#[source] DbError),

    /// The caller cancelled the run
    #[error("migration run cancelled")]
    Cancelled,

    /// The caller's deadline passed
    #[error("migration run deadline exceeded")]
    DeadlineExceeded,
}

/// `up` failure paired with the number of migrations committed before it
///
/// Migrations committed earlier in the same run stay applied.
#[derive(Debug, Error)]
#[error("{applied} migration(s) applied, then: {source}")]
pub struct UpError {
    pub applied: usize,
    #[source]
    pub source: MigrationError,
}

impl UpError {
    #[must_use]
    pub fn new(applied: usize, source: MigrationError) -> Self {
        Self { applied, source }
    }
}

impl From<MigrationError> for UpError {
    fn from(source: MigrationError) -> Self {
        Self { applied: 0, source }
    }
}
