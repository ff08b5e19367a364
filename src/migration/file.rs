//! SQL migration file discovery and parsing
//!
//! A migration file is named `<id>_<name>.sql` and split into sections by marker lines:
//!
//! ```sql
//! -- +migrate up
//! CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT NOT NULL);
//! CREATE INDEX idx_users_email ON users (email);
//!
//! -- +migrate down
//! DROP TABLE users;
//! ```
//!
//! The up section is required and must not be empty; the down section is optional (an
//! absent or empty down section reverts nothing). Each section runs as one script.

use crate::executor::DbError;
use crate::migration::{Catalog, DiscoveryError, Migration, SchemaManager};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A migration loaded from a `.sql` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    /// Migration id parsed from the file name
    pub id: i64,

    /// Human-readable migration name
    pub name: String,

    /// Path to the migration file
    pub path: PathBuf,

    /// Script for the up section
    pub up_sql: String,

    /// Script for the down section (may be empty)
    pub down_sql: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Up,
    Down,
}

impl SqlMigration {
    /// Parse migration file name to extract id and name
    ///
    /// Expected format: `{id}_{name}.sql`
    ///
    /// # Example
    /// - `00003_add_email_index.sql` → id: 3, name: "add_email_index"
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidFileName` if the name does not match and
    /// `DiscoveryError::InvalidId` for a zero id.
    pub fn parse_filename(path: &Path) -> Result<(i64, String), DiscoveryError> {
        let re = Regex::new(r"^(\d+)_([A-Za-z0-9_-]+)\.sql$").map_err(|e| DiscoveryError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("Invalid regex: {e}"),
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DiscoveryError::InvalidFileName(path.to_path_buf()))?;

        let caps = re
            .captures(filename)
            .ok_or_else(|| DiscoveryError::InvalidFileName(path.to_path_buf()))?;
        let (id_str, name) = (&caps[1], caps[2].to_string());

        let id = id_str.parse::<i64>().map_err(|e| DiscoveryError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("id '{id_str}' is not a valid 64-bit integer: {e}"),
        })?;
        if id <= 0 {
            return Err(DiscoveryError::InvalidId { id, name });
        }

        Ok((id, name))
    }

    /// Split file contents into up and down scripts
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidFormat` for a missing or empty up section or a
    /// marker that appears twice.
    pub fn parse_sections(path: &Path, contents: &str) -> Result<(String, String), DiscoveryError> {
        let invalid = |reason: &str| DiscoveryError::InvalidFormat {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut up: Option<String> = None;
        let mut down: Option<String> = None;
        let mut current: Option<Section> = None;

        for line in contents.lines() {
            if let Some(section) = marker(line) {
                let slot = match section {
                    Section::Up => &mut up,
                    Section::Down => &mut down,
                };
                if slot.is_some() {
                    return Err(invalid(match section {
                        Section::Up => "'-- +migrate up' appears more than once",
                        Section::Down => "'-- +migrate down' appears more than once",
                    }));
                }
                *slot = Some(String::new());
                current = Some(section);
                continue;
            }

            // Text before the first marker is ignored
            let target = match current {
                Some(Section::Up) => up.as_mut(),
                Some(Section::Down) => down.as_mut(),
                None => None,
            };
            if let Some(script) = target {
                script.push_str(line);
                script.push('\n');
            }
        }

        let up = up.ok_or_else(|| invalid("missing '-- +migrate up' section"))?;
        let up = up.trim().to_string();
        if up.is_empty() {
            return Err(invalid("'-- +migrate up' section is empty"));
        }
        let down = down.map(|d| d.trim().to_string()).unwrap_or_default();

        Ok((up, down))
    }

    /// Load one migration file
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError` if the name or contents are invalid or the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, DiscoveryError> {
        let (id, name) = Self::parse_filename(path)?;
        let contents = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (up_sql, down_sql) = Self::parse_sections(path, &contents)?;

        Ok(Self {
            id,
            name,
            path: path.to_path_buf(),
            up_sql,
            down_sql,
        })
    }
}

fn marker(line: &str) -> Option<Section> {
    let rest = line.trim().strip_prefix("--")?;
    let mut words = rest.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("+migrate") {
        return None;
    }
    let section = match words.next()?.to_ascii_lowercase().as_str() {
        "up" => Section::Up,
        "down" => Section::Down,
        _ => return None,
    };
    words.next().is_none().then_some(section)
}

impl Migration for SqlMigration {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.batch_execute(&self.up_sql)
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        if self.down_sql.is_empty() {
            log::debug!("Migration {} has no down section", self.id);
            return Ok(());
        }
        manager.batch_execute(&self.down_sql)
    }
}

/// `.sql` files directly inside `dir`, sorted by path
fn sql_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.is_dir() {
        return Err(DiscoveryError::DirectoryNotFound(dir.to_path_buf()));
    }

    let io_err = |source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();

        // Only process .sql files
        if path.is_dir() || path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Discover all SQL migrations in a directory
///
/// Scans `dir` (not recursively) for `<id>_<name>.sql` files, parses them, and returns
/// them as a catalog sorted by id.
///
/// # Errors
///
/// Returns errors if:
/// - The directory doesn't exist or can't be read
/// - A `.sql` file has an invalid name or contents
/// - Two files share an id
pub fn discover_migrations(dir: &Path) -> Result<Catalog, DiscoveryError> {
    let mut migrations: Vec<SqlMigration> = Vec::new();
    for path in sql_files(dir)? {
        migrations.push(SqlMigration::load(&path)?);
    }

    migrations.sort_by_key(|m| m.id);
    if let Some(pair) = migrations.windows(2).find(|w| w[0].id == w[1].id) {
        return Err(DiscoveryError::DuplicateId {
            id: pair[0].id,
            first: pair[0].path.display().to_string(),
            second: pair[1].path.display().to_string(),
        });
    }

    log::debug!("Discovered {} migration file(s) in {}", migrations.len(), dir.display());
    Catalog::new(
        migrations
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn Migration>),
    )
}

/// Id a new migration in `dir` should use: one past the highest existing id
///
/// Only file names are inspected; contents are not parsed.
///
/// # Errors
///
/// Returns `DiscoveryError` if the directory cannot be read or holds a badly named `.sql` file.
pub fn next_migration_id(dir: &Path) -> Result<i64, DiscoveryError> {
    let mut max = 0;
    for path in sql_files(dir)? {
        let (id, _) = SqlMigration::parse_filename(&path)?;
        max = max.max(id);
    }
    Ok(max + 1)
}

/// Scaffold a new SQL migration file with empty up and down sections
///
/// The directory is created if needed. Returns the path of the new file.
///
/// # Errors
///
/// Returns `DiscoveryError::InvalidFormat` for a name outside `[A-Za-z0-9_-]+`, and
/// `DiscoveryError::Io` if the file cannot be written.
pub fn create_sql_migration(dir: &Path, name: &str) -> Result<PathBuf, DiscoveryError> {
    fs::create_dir_all(dir).map_err(|source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let id = next_migration_id(dir)?;
    let path = dir.join(format!("{id:05}_{name}.sql"));

    // Round-trip through the parser so scaffolded names are always discoverable
    SqlMigration::parse_filename(&path).map_err(|_| DiscoveryError::InvalidFormat {
        path: path.clone(),
        reason: format!("migration name '{name}' must match [A-Za-z0-9_-]+"),
    })?;

    let template = format!(
        "-- Migration: {name}\n-- Created: {}\n\n-- +migrate up\n\n\n-- +migrate down\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    fs::write(&path, template).map_err(|source| DiscoveryError::Io {
        path: path.clone(),
        source,
    })?;

    log::info!("Created migration {}", path.display());
    Ok(path)
}
