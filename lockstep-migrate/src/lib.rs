//! lockstep-migrate library
//!
//! Argument definitions, command dispatch and output formatting for the CLI. `main.rs`
//! only parses arguments, sets up logging and maps the result to an exit code.

use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lockstep::migration::{create_sql_migration, MigrationStatus};
use lockstep::{connect, Context, MigrationResult, Settings, UpError};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lockstep-migrate")]
#[command(about = "Apply, revert and inspect lockstep migrations")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: config/lockstep.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database connection URL (falls back to LOCKSTEP_DATABASE__URL, then DATABASE_URL)
    #[arg(short, long, global = true)]
    pub database_url: Option<String>,

    /// Migrations directory
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Schema holding the version table
    #[arg(short, long, global = true)]
    pub schema: Option<String>,

    /// Version table name
    #[arg(short, long, global = true)]
    pub table: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending migrations
    Up {
        /// Apply even if earlier migrations were skipped (dirty history)
        #[arg(short, long)]
        force: bool,
    },

    /// Revert the most recently applied migration
    Down,

    /// Revert and re-apply the most recently applied migration
    Redo,

    /// Show migration status (applied vs pending)
    Status {
        /// Print a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the current database version (0 when nothing is applied)
    #[command(name = "dbversion")]
    DbVersion,

    /// Create a new SQL migration file
    Create {
        /// Migration name (e.g., "create_users_table")
        name: String,
    },
}

impl Cli {
    /// Log filter used unless `RUST_LOG` is set
    pub fn default_log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Execute the parsed command; returns the process exit code
///
/// # Errors
///
/// Returns an error for configuration, connection and migration failures. A partially
/// failed `up` is reported on stderr and yields exit code 1 instead.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.dir {
        settings.migrations.directory = dir;
    }
    if let Some(schema) = cli.schema {
        settings.migrations.schema = schema;
    }
    if let Some(table) = cli.table {
        settings.migrations.table = table;
    }

    let force = matches!(cli.command, Command::Up { force: true });
    let config = settings.migrate_config(force)?;
    log::debug!(
        "Migrations in {}, version table {}",
        settings.migrations.directory.display(),
        config.version_table()
    );

    if let Command::Create { name } = &cli.command {
        let path = create_sql_migration(&settings.migrations.directory, name)?;
        println!("{} {}", "created".green(), path.display());
        return Ok(0);
    }

    let url = resolve_database_url(cli.database_url, &settings).ok_or_else(|| {
        anyhow!("database URL not provided; use --database-url or set LOCKSTEP_DATABASE__URL or DATABASE_URL")
    })?;
    let db = connect(&url).context("failed to connect to database")?;
    let ctx = Context::new();

    match cli.command {
        Command::Up { .. } => {
            let result = lockstep::up(&ctx, &db, &config);
            let message = up_message(&result);
            if result.is_err() {
                eprintln!("{}", message.red());
                return Ok(1);
            }
            println!("{}", message.green());
        }
        Command::Down => {
            let id = lockstep::down(&ctx, &db, &config)?;
            println!("{}", format!("success: reverted migration {id}").green());
        }
        Command::Redo => {
            let id = lockstep::redo(&ctx, &db, &config)?;
            println!("{}", format!("success: redone migration {id}").green());
        }
        Command::Status { json } => {
            let report = lockstep::status(&ctx, &db, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_status(&report));
            }
        }
        Command::DbVersion => {
            println!("{}", lockstep::db_version(&ctx, &db, &config)?);
        }
        Command::Create { .. } => {}
    }
    Ok(0)
}

/// Flag, then configuration (`LOCKSTEP_DATABASE__URL` or the config file), then `DATABASE_URL`
pub fn resolve_database_url(flag: Option<String>, settings: &Settings) -> Option<String> {
    flag.or_else(|| settings.database.url.clone())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
}

/// One-line summary of an `up` run
pub fn up_message(result: &Result<usize, UpError>) -> String {
    match result {
        Ok(0) => "the database is up to date, nothing to migrate".to_string(),
        Ok(applied) => format!("success: applied {applied} migration(s)"),
        Err(e) => format!(
            "{} migration(s) applied, an error occurred: {}",
            e.applied, e.source
        ),
    }
}

/// Plain-text status table followed by a summary line
pub fn render_status(report: &[MigrationResult]) -> String {
    if report.is_empty() {
        return "No migrations found\n".to_string();
    }

    let id_width = report
        .iter()
        .map(|r| r.id.to_string().len())
        .max()
        .unwrap_or(0)
        .max("ID".len());
    let name_width = report
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<id_width$}  {:<name_width$}  APPLIED AT\n", "ID", "NAME");
    for record in report {
        let applied_at = match record.applied_at {
            Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "pending".to_string(),
        };
        out.push_str(&format!(
            "{:<id_width$}  {:<name_width$}  {}\n",
            record.id, record.name, applied_at
        ));
    }

    let status = MigrationStatus::new(report.to_vec());
    out.push_str(&format!(
        "\nSummary: {} applied, {} pending\n",
        status.applied.len(),
        status.pending.len()
    ));
    let gaps = status.gaps();
    if !gaps.is_empty() {
        out.push_str(&format!(
            "Dirty: {gaps:?} pending below version {} (up requires --force)\n",
            status.latest_applied_id().unwrap_or(0)
        ));
    }
    out
}
