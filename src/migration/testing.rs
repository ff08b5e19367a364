//! In-memory database and version store for unit tests
//!
//! `MemoryDatabase` and the `MemoryStore` it hands out share one state. Statements and
//! version-table writes made inside a transaction are staged and only become visible
//! when the transaction commits; rollback (explicit or on drop) discards them.
//! `fail_on(pattern)` makes any statement containing `pattern` fail, and also any store
//! operation whose name (`ensure_table`, `read_history`, `record_applied`,
//! `record_reverted`, `current_version`) contains it.

use crate::executor::{Database, DbError, SqlExecutor, Transaction};
use crate::migration::{Migration, MigrationError, MigrationResult, SchemaManager, VersionStore};
use crate::row::{Row, Value};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

enum StagedWrite {
    Applied(MigrationResult),
    Reverted(i64),
}

#[derive(Default)]
struct State {
    executed: Vec<String>,
    staged_statements: Vec<String>,
    staged_writes: Vec<StagedWrite>,
    history: BTreeMap<i64, MigrationResult>,
    fail_on: Vec<String>,
    table_ensured: usize,
    commits: usize,
    rollbacks: usize,
}

impl State {
    fn should_fail(&self, what: &str) -> bool {
        self.fail_on.iter().any(|p| what.contains(p.as_str()))
    }

    fn discard_staged(&mut self) {
        self.staged_statements.clear();
        self.staged_writes.clear();
    }
}

fn injected(what: &str) -> DbError {
    DbError::Query(format!("injected failure: {what}"))
}

#[derive(Default)]
pub struct MemoryDatabase {
    state: Rc<RefCell<State>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version store backed by this database's history
    pub fn store(&self) -> MemoryStore {
        MemoryStore {
            state: Rc::clone(&self.state),
        }
    }

    /// Make statements or store operations containing `pattern` fail
    pub fn fail_on(&self, pattern: &str) {
        self.state.borrow_mut().fail_on.push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.borrow_mut().fail_on.clear();
    }

    /// Committed statements, in execution order
    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }

    /// Pretend these migrations were applied before the test started
    pub fn seed_history(&self, ids: &[i64]) {
        let mut state = self.state.borrow_mut();
        for &id in ids {
            state
                .history
                .insert(id, MigrationResult::applied(id, format!("m{id}"), Utc::now()));
        }
    }

    pub fn history_ids(&self) -> Vec<i64> {
        self.state.borrow().history.keys().copied().collect()
    }

    pub fn history(&self) -> Vec<MigrationResult> {
        self.state.borrow().history.values().cloned().collect()
    }

    pub fn commits(&self) -> usize {
        self.state.borrow().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.borrow().rollbacks
    }

    pub fn table_ensured(&self) -> usize {
        self.state.borrow().table_ensured
    }
}

impl SqlExecutor for MemoryDatabase {
    fn execute(&self, query: &str, _params: &[Value]) -> Result<u64, DbError> {
        let mut state = self.state.borrow_mut();
        if state.should_fail(query) {
            return Err(injected(query));
        }
        state.executed.push(query.to_string());
        Ok(0)
    }

    fn batch_execute(&self, script: &str) -> Result<(), DbError> {
        self.execute(script, &[]).map(|_| ())
    }

    fn query_all(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.execute(query, params).map(|_| Vec::new())
    }
}

impl Database for MemoryDatabase {
    type Transaction<'a> = MemoryTransaction<'a> where Self: 'a;

    fn begin(&self) -> Result<MemoryTransaction<'_>, DbError> {
        let mut state = self.state.borrow_mut();
        if state.should_fail("BEGIN") {
            return Err(injected("BEGIN"));
        }
        state.discard_staged();
        Ok(MemoryTransaction {
            db: self,
            open: true,
        })
    }
}

pub struct MemoryTransaction<'a> {
    db: &'a MemoryDatabase,
    open: bool,
}

impl MemoryTransaction<'_> {
    fn discard(&mut self) {
        self.open = false;
        let mut state = self.db.state.borrow_mut();
        state.discard_staged();
        state.rollbacks += 1;
    }
}

impl SqlExecutor for MemoryTransaction<'_> {
    fn execute(&self, query: &str, _params: &[Value]) -> Result<u64, DbError> {
        let mut state = self.db.state.borrow_mut();
        if state.should_fail(query) {
            return Err(injected(query));
        }
        state.staged_statements.push(query.to_string());
        Ok(0)
    }

    fn batch_execute(&self, script: &str) -> Result<(), DbError> {
        self.execute(script, &[]).map(|_| ())
    }

    fn query_all(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.execute(query, params).map(|_| Vec::new())
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(mut self) -> Result<(), DbError> {
        if self.db.state.borrow().should_fail("COMMIT") {
            self.discard();
            return Err(injected("COMMIT"));
        }

        self.open = false;
        let mut state = self.db.state.borrow_mut();
        let statements = std::mem::take(&mut state.staged_statements);
        state.executed.extend(statements);
        for write in std::mem::take(&mut state.staged_writes) {
            match write {
                StagedWrite::Applied(record) => {
                    state.history.insert(record.id, record);
                }
                StagedWrite::Reverted(id) => {
                    state.history.remove(&id);
                }
            }
        }
        state.commits += 1;
        Ok(())
    }

    fn rollback(mut self) -> Result<(), DbError> {
        self.discard();
        if self.db.state.borrow().should_fail("ROLLBACK") {
            return Err(injected("ROLLBACK"));
        }
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            self.discard();
        }
    }
}

/// Version store sharing state with a `MemoryDatabase`
pub struct MemoryStore {
    state: Rc<RefCell<State>>,
}

impl MemoryStore {
    fn check(&self, op: &str) -> Result<(), MigrationError> {
        if self.state.borrow().should_fail(op) {
            return Err(MigrationError::Persistence(injected(op)));
        }
        Ok(())
    }
}

impl VersionStore for MemoryStore {
    fn ensure_table(&self, _executor: &dyn SqlExecutor) -> Result<(), MigrationError> {
        self.check("ensure_table")?;
        self.state.borrow_mut().table_ensured += 1;
        Ok(())
    }

    fn read_history(&self, _executor: &dyn SqlExecutor) -> Result<Vec<MigrationResult>, MigrationError> {
        self.check("read_history")?;
        // Reverse order: callers must treat history as a set
        Ok(self.state.borrow().history.values().rev().cloned().collect())
    }

    fn record_applied(
        &self,
        _tx: &dyn SqlExecutor,
        id: i64,
        name: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<(), MigrationError> {
        self.check("record_applied")?;
        self.state
            .borrow_mut()
            .staged_writes
            .push(StagedWrite::Applied(MigrationResult::applied(id, name, applied_at)));
        Ok(())
    }

    fn record_reverted(&self, _tx: &dyn SqlExecutor, id: i64) -> Result<(), MigrationError> {
        self.check("record_reverted")?;
        self.state.borrow_mut().staged_writes.push(StagedWrite::Reverted(id));
        Ok(())
    }

    fn current_version(&self, _executor: &dyn SqlExecutor) -> Result<i64, MigrationError> {
        self.check("current_version")?;
        Ok(self
            .state
            .borrow()
            .history
            .keys()
            .next_back()
            .copied()
            .unwrap_or(crate::migration::NO_VERSION))
    }
}

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Migration running `CREATE TABLE t<id>` up and `DROP TABLE t<id>` down
pub struct StubMigration {
    id: i64,
    name: String,
    up_hook: Option<Hook>,
}

impl StubMigration {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            up_hook: None,
        }
    }

    /// Run `hook` after the up statement succeeds
    pub fn on_up(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.up_hook = Some(Arc::new(hook));
        self
    }
}

impl Migration for StubMigration {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.batch_execute(&format!("CREATE TABLE t{}", self.id))?;
        if let Some(hook) = &self.up_hook {
            hook();
        }
        Ok(())
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.batch_execute(&format!("DROP TABLE t{}", self.id))
    }
}

/// Catalog of stub migrations with the given ids
pub fn stub_catalog(ids: &[i64]) -> crate::migration::Catalog {
    let migrations = ids
        .iter()
        .map(|&id| Arc::new(StubMigration::new(id, format!("m{id}"))) as Arc<dyn Migration>);
    match crate::migration::Catalog::new(migrations) {
        Ok(catalog) => catalog,
        Err(e) => panic!("invalid stub catalog {ids:?}: {e}"),
    }
}
