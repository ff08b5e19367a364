//! Span constructors shared by the executor, transactions and the migrator
//!
//! Only compiled with the `tracing` feature. Call sites hold the returned span entered
//! for the duration of the unit of work.

use tracing::{info_span, Span};

/// Longest statement prefix recorded on query spans
const MAX_STATEMENT_LEN: usize = 120;

pub fn execute_query_span(query: &str) -> Span {
    let statement = query.trim();
    let statement = match statement.char_indices().nth(MAX_STATEMENT_LEN) {
        Some((cut, _)) => &statement[..cut],
        None => statement,
    };
    info_span!("lockstep.query", db.statement = statement)
}

pub fn begin_transaction_span() -> Span {
    info_span!("lockstep.transaction.begin")
}

pub fn commit_transaction_span() -> Span {
    info_span!("lockstep.transaction.commit")
}

pub fn rollback_transaction_span() -> Span {
    info_span!("lockstep.transaction.rollback")
}

/// One span per migration transaction
pub fn migration_span(id: i64, name: &str, direction: &str) -> Span {
    info_span!("lockstep.migration", migration.id = id, migration.name = name, direction)
}

/// One span per `up`/`down`/`redo` run
pub fn run_span(operation: &'static str) -> Span {
    info_span!("lockstep.run", operation)
}
