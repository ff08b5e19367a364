//! SchemaManager - Provides methods for schema operations in migrations

use crate::dialect::Dialect;
use crate::executor::{DbError, SqlExecutor};
use crate::row::{Row, Value};
use sea_query::{
    ColumnDef, IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, Table,
    TableAlterStatement, TableCreateStatement, TableDropStatement,
};
use std::fmt::Display;

/// Handed to [`Migration::up`](super::Migration::up) and
/// [`Migration::down`](super::Migration::down)
///
/// Wraps the migration's open transaction, so everything executed through it commits or
/// rolls back together with the version-table write.
pub struct SchemaManager<'a> {
    executor: &'a dyn SqlExecutor,
    dialect: Dialect,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn SqlExecutor, dialect: Dialect) -> Self {
        Self { executor, dialect }
    }

    /// Dialect the statements are rendered for
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Create a table
    ///
    /// # Example
    /// ```rust,no_run
    /// # use lockstep::migration::SchemaManager;
    /// # let manager: &SchemaManager<'_> = todo!();
    /// use sea_query::{Table, ColumnDef};
    ///
    /// let table = Table::create()
    ///     .table("users")
    ///     .col(ColumnDef::new("id").big_integer().not_null().primary_key())
    ///     .col(ColumnDef::new("email").string().not_null().unique_key())
    ///     .to_owned();
    ///
    /// manager.create_table(table)?;
    /// # Ok::<(), lockstep::DbError>(())
    /// ```
    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), DbError> {
        let sql = match self.dialect {
            Dialect::Postgres => table.build(PostgresQueryBuilder),
        };
        self.execute(&sql, &[])
    }

    /// Drop a table
    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), DbError> {
        let sql = match self.dialect {
            Dialect::Postgres => table.build(PostgresQueryBuilder),
        };
        self.execute(&sql, &[])
    }

    /// Alter a table
    pub fn alter_table(&self, alter: TableAlterStatement) -> Result<(), DbError> {
        let sql = match self.dialect {
            Dialect::Postgres => alter.build(PostgresQueryBuilder),
        };
        self.execute(&sql, &[])
    }

    /// Create an index
    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), DbError> {
        let sql = match self.dialect {
            Dialect::Postgres => index.build(PostgresQueryBuilder),
        };
        self.execute(&sql, &[])
    }

    /// Drop an index
    pub fn drop_index(&self, index: IndexDropStatement) -> Result<(), DbError> {
        let sql = match self.dialect {
            Dialect::Postgres => index.build(PostgresQueryBuilder),
        };
        self.execute(&sql, &[])
    }

    /// Add a column to an existing table
    ///
    /// # Example
    /// ```rust,no_run
    /// # use lockstep::migration::SchemaManager;
    /// # let manager: &SchemaManager<'_> = todo!();
    /// use sea_query::ColumnDef;
    ///
    /// manager.add_column("users", ColumnDef::new("avatar_url").string().null().to_owned())?;
    /// # Ok::<(), lockstep::DbError>(())
    /// ```
    pub fn add_column<T: Display>(&self, table: T, column: ColumnDef) -> Result<(), DbError> {
        let alter = Table::alter()
            .table(table.to_string())
            .add_column(column)
            .to_owned();
        self.alter_table(alter)
    }

    /// Drop a column from an existing table
    pub fn drop_column<T: Display>(&self, table: T, column: &str) -> Result<(), DbError> {
        let alter = Table::alter()
            .table(table.to_string())
            .drop_column(column.to_string())
            .to_owned();
        self.alter_table(alter)
    }

    /// Execute one statement
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        self.executor.execute(sql, params).map(|_| ())
    }

    /// Execute a multi-statement script (the body of a SQL migration file)
    pub fn batch_execute(&self, script: &str) -> Result<(), DbError> {
        self.executor.batch_execute(script)
    }

    /// Query inside the migration's transaction (data migrations)
    pub fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.executor.query_all(sql, params)
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &dyn SqlExecutor {
        self.executor
    }
}
