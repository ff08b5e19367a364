//! `PostgreSQL` transactions
//!
//! Each migration runs inside exactly one [`PostgresTransaction`]: its action and the
//! version-table write commit or roll back together.

use crate::executor::{pg_batch_execute, pg_execute, pg_query_all, DbError, SqlExecutor, Transaction};
use crate::row::{Row, Value};
use may_postgres::Client;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// A top-level `PostgreSQL` transaction on a clone of the connection's client
///
/// Dropping an open transaction issues a best-effort `ROLLBACK`.
pub struct PostgresTransaction {
    client: Client,
    closed: bool,
}

impl PostgresTransaction {
    pub(crate) fn begin(client: Client) -> Result<Self, DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span().entered();

        client.batch_execute("BEGIN")?;

        Ok(Self {
            client,
            closed: false,
        })
    }

    /// Check if the transaction is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed {
            return Err(DbError::Other("Transaction is closed".to_string()));
        }
        Ok(())
    }

    fn finish(&mut self, statement: &str) -> Result<(), DbError> {
        self.ensure_open()?;
        // Closed even if the statement fails: the server aborts the transaction either way.
        self.closed = true;
        self.client.batch_execute(statement)?;
        Ok(())
    }
}

impl SqlExecutor for PostgresTransaction {
    fn execute(&self, query: &str, params: &[Value]) -> Result<u64, DbError> {
        self.ensure_open()?;
        pg_execute(&self.client, query, params)
    }

    fn batch_execute(&self, script: &str) -> Result<(), DbError> {
        self.ensure_open()?;
        pg_batch_execute(&self.client, script)
    }

    fn query_all(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.ensure_open()?;
        pg_query_all(&self.client, query, params)
    }
}

impl Transaction for PostgresTransaction {
    fn commit(mut self) -> Result<(), DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span().entered();

        self.finish("COMMIT")
    }

    fn rollback(mut self) -> Result<(), DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span().entered();

        self.finish("ROLLBACK")
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.client.batch_execute("ROLLBACK") {
                log::warn!("Failed to roll back abandoned transaction: {e}");
            }
        }
    }
}
