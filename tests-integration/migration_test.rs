//! Integration tests for the migration system
//!
//! These run against a real PostgreSQL database named by `LOCKSTEP_TEST_DATABASE_URL`
//! and are skipped when it is not set. Each test keeps its version table in a schema
//! of its own, so tests can share one database.

use lockstep::migration::{Migration, MigrationError, Registry, SchemaManager};
use lockstep::{connect, Context, DbError, MigrateConfig, PostgresDatabase, SqlExecutor, Value};
use sea_query::{ColumnDef, Table};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static SCHEMA_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Test database plus a private schema dropped on exit
struct TestSchema {
    db: PostgresDatabase,
    name: String,
}

impl TestSchema {
    fn create() -> Option<Self> {
        let Ok(url) = env::var("LOCKSTEP_TEST_DATABASE_URL") else {
            eprintln!("LOCKSTEP_TEST_DATABASE_URL not set; skipping");
            return None;
        };
        let db = connect(&url).expect("Failed to connect to test database");
        let name = format!(
            "lockstep_it_{}_{}",
            std::process::id(),
            SCHEMA_SEQ.fetch_add(1, Ordering::SeqCst)
        );
        db.batch_execute(&format!("CREATE SCHEMA {name}"))
            .expect("Failed to create test schema");
        Some(Self { db, name })
    }

    fn table_exists(&self, table: &str) -> bool {
        let rows = self
            .db
            .query_all(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema::text = $1 AND table_name::text = $2",
                &[Value::from(self.name.as_str()), Value::from(table)],
            )
            .expect("Failed to query information_schema");
        rows[0].get_i64(0).expect("COUNT(*) should be an integer") == 1
    }

    fn history_ids(&self) -> Vec<i64> {
        self.db
            .query_all(&format!("SELECT id FROM {}.migrations ORDER BY id", self.name), &[])
            .expect("Failed to read version table")
            .iter()
            .map(|row| row.get_i64(0).expect("id should be an integer"))
            .collect()
    }
}

impl Drop for TestSchema {
    fn drop(&mut self) {
        if let Err(e) = self.db.batch_execute(&format!("DROP SCHEMA {} CASCADE", self.name)) {
            eprintln!("Failed to drop test schema {}: {e}", self.name);
        }
    }
}

/// Creates `<schema>.t<id>`; `fail` adds a statement that errors after the create
struct CreateTable {
    id: i64,
    schema: String,
    fail: bool,
}

impl CreateTable {
    fn new(id: i64, schema: &str) -> Self {
        Self {
            id,
            schema: schema.to_string(),
            fail: false,
        }
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn table(&self) -> String {
        format!("{}.t{}", self.schema, self.id)
    }
}

impl Migration for CreateTable {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        "create_table"
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.batch_execute(&format!("CREATE TABLE {} (id BIGINT PRIMARY KEY)", self.table()))?;
        if self.fail {
            manager.batch_execute("SELECT * FROM lockstep_no_such_table")?;
        }
        Ok(())
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.batch_execute(&format!("DROP TABLE {}", self.table()))
    }
}

fn registry(migrations: Vec<CreateTable>) -> Registry {
    let mut registry = Registry::new();
    for migration in migrations {
        registry.register(migration).expect("Failed to register migration");
    }
    registry
}

fn config_for(schema: &TestSchema, registry: Registry, force: bool) -> MigrateConfig {
    MigrateConfig::builder()
        .registry(registry)
        .schema(schema.name.as_str())
        .force(force)
        .build()
        .expect("Invalid test configuration")
}

#[test]
fn test_registry_lifecycle() {
    let Some(schema) = TestSchema::create() else { return };
    let ctx = Context::new();
    let config = config_for(
        &schema,
        registry(vec![CreateTable::new(1, &schema.name), CreateTable::new(2, &schema.name)]),
        false,
    );

    assert_eq!(lockstep::db_version(&ctx, &schema.db, &config).unwrap(), 0);
    assert_eq!(lockstep::up(&ctx, &schema.db, &config).unwrap(), 2);
    assert_eq!(lockstep::up(&ctx, &schema.db, &config).unwrap(), 0, "Second run is a no-op");
    assert_eq!(schema.history_ids(), vec![1, 2]);
    assert!(schema.table_exists("t1") && schema.table_exists("t2"));

    let status = lockstep::status(&ctx, &schema.db, &config).unwrap();
    assert!(status.iter().all(|r| r.is_applied()));

    assert_eq!(lockstep::redo(&ctx, &schema.db, &config).unwrap(), 2);
    assert_eq!(schema.history_ids(), vec![1, 2]);
    assert!(schema.table_exists("t2"));

    assert_eq!(lockstep::down(&ctx, &schema.db, &config).unwrap(), 2);
    assert!(!schema.table_exists("t2"));
    assert_eq!(lockstep::down(&ctx, &schema.db, &config).unwrap(), 1);
    assert!(matches!(
        lockstep::down(&ctx, &schema.db, &config),
        Err(MigrationError::NothingToRevert)
    ));
    assert!(schema.history_ids().is_empty());
}

#[test]
fn test_failed_migration_rolls_back() {
    let Some(schema) = TestSchema::create() else { return };
    let ctx = Context::new();
    let config = config_for(
        &schema,
        registry(vec![
            CreateTable::new(1, &schema.name),
            CreateTable::new(2, &schema.name).failing(),
            CreateTable::new(3, &schema.name),
        ]),
        false,
    );

    let err = lockstep::up(&ctx, &schema.db, &config).unwrap_err();

    assert_eq!(err.applied, 1);
    assert!(matches!(err.source, MigrationError::ExecutionFailed { id: 2, .. }));
    assert_eq!(schema.history_ids(), vec![1]);
    assert!(schema.table_exists("t1"));
    assert!(!schema.table_exists("t2"), "Failed migration's DDL must roll back");
    assert!(!schema.table_exists("t3"), "Later migrations must not run");
}

#[test]
fn test_dirty_history_requires_force() {
    let Some(schema) = TestSchema::create() else { return };
    let ctx = Context::new();

    // Apply 2 and 3 first, then introduce 1 "late"
    let late = config_for(
        &schema,
        registry(vec![CreateTable::new(2, &schema.name), CreateTable::new(3, &schema.name)]),
        false,
    );
    assert_eq!(lockstep::up(&ctx, &schema.db, &late).unwrap(), 2);

    let full = || {
        registry(vec![
            CreateTable::new(1, &schema.name),
            CreateTable::new(2, &schema.name),
            CreateTable::new(3, &schema.name),
        ])
    };

    let err = lockstep::up(&ctx, &schema.db, &config_for(&schema, full(), false)).unwrap_err();
    assert_eq!(err.applied, 0);
    assert!(matches!(
        err.source,
        MigrationError::DirtyMigrations { ref ids, current_version: 3 } if ids == &vec![1]
    ));
    assert!(!schema.table_exists("t1"));

    assert_eq!(lockstep::up(&ctx, &schema.db, &config_for(&schema, full(), true)).unwrap(), 1);
    assert_eq!(schema.history_ids(), vec![1, 2, 3]);
}

#[test]
fn test_schema_manager_builds_with_sea_query() {
    struct Widgets {
        schema: String,
    }

    impl Migration for Widgets {
        fn id(&self) -> i64 {
            1
        }

        fn name(&self) -> &str {
            "create_widgets"
        }

        fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
            manager.batch_execute(&format!("SET LOCAL search_path TO {}", self.schema))?;
            let table = Table::create()
                .table("widgets".to_string())
                .col(ColumnDef::new("id".to_string()).big_integer().not_null().primary_key())
                .col(ColumnDef::new("label".to_string()).string().not_null())
                .to_owned();
            manager.create_table(table)
        }

        fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
            manager.batch_execute(&format!("SET LOCAL search_path TO {}", self.schema))?;
            manager.drop_table(Table::drop().table("widgets".to_string()).to_owned())
        }
    }

    let Some(schema) = TestSchema::create() else { return };
    let ctx = Context::new();
    let mut registry = Registry::new();
    registry
        .register(Widgets { schema: schema.name.clone() })
        .expect("Failed to register migration");
    let config = config_for(&schema, registry, false);

    assert_eq!(lockstep::up(&ctx, &schema.db, &config).unwrap(), 1);
    assert!(schema.table_exists("widgets"));
    lockstep::down(&ctx, &schema.db, &config).unwrap();
    assert!(!schema.table_exists("widgets"));
}

#[test]
fn test_sample_sql_migrations() {
    let Some(schema) = TestSchema::create() else { return };
    let ctx = Context::new();
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../migrations");
    let config = MigrateConfig::builder()
        .directory(dir)
        .schema(schema.name.as_str())
        .build()
        .expect("Invalid test configuration");

    assert_eq!(lockstep::up(&ctx, &schema.db, &config).unwrap(), 3);
    assert_eq!(lockstep::db_version(&ctx, &schema.db, &config).unwrap(), 3);

    for expected in [3, 2, 1] {
        assert_eq!(lockstep::down(&ctx, &schema.db, &config).unwrap(), expected);
    }
    assert_eq!(lockstep::db_version(&ctx, &schema.db, &config).unwrap(), 0);
}
