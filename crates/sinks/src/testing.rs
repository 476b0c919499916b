//! In-memory [`Datastore`] for tests
//!
//! Records every batch, async insert and DDL statement, and can be told to
//! fail specific operations.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::datastore::{Datastore, EventRow, PreparedBatch, StoreError};

#[derive(Default)]
struct State {
    batches: Vec<Vec<EventRow>>,
    async_rows: Vec<EventRow>,
    executed: Vec<String>,
    tables: Vec<String>,
    prepared: usize,
    aborted: usize,

    unavailable: bool,
    fail_append_at: Option<usize>,
    fail_async_for: Vec<String>,
    fail_exec_containing: Vec<String>,
}

/// Recording store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Fail the append at `index` (0-based) of every batch
    pub fn fail_append_at(&self, index: usize) {
        self.state.lock().fail_append_at = Some(index);
    }

    /// Fail async inserts for rows with this `distinct_id`
    pub fn fail_async_for(&self, distinct_id: impl Into<String>) {
        self.state.lock().fail_async_for.push(distinct_id.into());
    }

    /// Fail DDL statements containing `fragment`
    pub fn fail_exec_containing(&self, fragment: impl Into<String>) {
        self.state.lock().fail_exec_containing.push(fragment.into());
    }

    /// Committed batches, in commit order
    pub fn batches(&self) -> Vec<Vec<EventRow>> {
        self.state.lock().batches.clone()
    }

    /// Rows written through async insert, in order
    pub fn async_rows(&self) -> Vec<EventRow> {
        self.state.lock().async_rows.clone()
    }

    /// Every persisted row, batches first
    pub fn rows(&self) -> Vec<EventRow> {
        let state = self.state.lock();
        state
            .batches
            .iter()
            .flatten()
            .chain(state.async_rows.iter())
            .cloned()
            .collect()
    }

    /// DDL statements that succeeded, in order
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    /// Tables written to, one entry per batch or async insert
    pub fn tables(&self) -> Vec<String> {
        self.state.lock().tables.clone()
    }

    /// Number of batches prepared
    pub fn prepared(&self) -> usize {
        self.state.lock().prepared
    }

    /// Number of batches aborted
    pub fn aborted(&self) -> usize {
        self.state.lock().aborted
    }
}

fn unavailable() -> StoreError {
    StoreError::Other("store unavailable".into())
}

struct MemoryBatch {
    state: Arc<Mutex<State>>,
    rows: Vec<EventRow>,
    fail_at: Option<usize>,
}

#[async_trait]
impl PreparedBatch for MemoryBatch {
    async fn append(&mut self, row: &EventRow) -> Result<(), StoreError> {
        if self.fail_at == Some(self.rows.len()) {
            return Err(StoreError::Other(format!(
                "append {} rejected",
                self.rows.len()
            )));
        }
        self.rows.push(row.clone());
        Ok(())
    }

    async fn send(self: Box<Self>) -> Result<(), StoreError> {
        let Self { state, rows, .. } = *self;
        let mut guard = state.lock();
        if guard.unavailable {
            return Err(unavailable());
        }
        guard.batches.push(rows);
        Ok(())
    }

    async fn abort(self: Box<Self>) {
        self.state.lock().aborted += 1;
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn PreparedBatch>, StoreError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(unavailable());
        }
        state.prepared += 1;
        state.tables.push(table.to_string());
        Ok(Box::new(MemoryBatch {
            state: Arc::clone(&self.state),
            rows: Vec::new(),
            fail_at: state.fail_append_at,
        }))
    }

    async fn async_insert(
        &self,
        table: &str,
        row: &EventRow,
        _wait: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.unavailable || state.fail_async_for.contains(&row.distinct_id) {
            return Err(unavailable());
        }
        state.tables.push(table.to_string());
        state.async_rows.push(row.clone());
        Ok(())
    }

    async fn exec(&self, ddl: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state
            .fail_exec_containing
            .iter()
            .any(|fragment| ddl.contains(fragment.as_str()))
        {
            return Err(StoreError::Other("statement rejected".into()));
        }
        state.executed.push(ddl.to_string());
        Ok(())
    }
}
