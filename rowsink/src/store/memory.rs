//! In-memory implementation of the store contract.
//!
//! Used by the test suite: records committed batches and supports scripted
//! failure injection for the begin, prepare, execute, and commit phases.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ErrorKind, SinkError, SinkResult};
use crate::schema::ColumnDescriptor;
use crate::sink_error;
use crate::store::base::{StoreClient, StoreConnection, StoreTransaction};
use crate::types::Cell;

#[derive(Debug, Default)]
struct Inner {
    columns: Vec<ColumnDescriptor>,
    /// Committed transactions, each an ordered list of bound rows.
    committed: Vec<Vec<Vec<Cell>>>,
    prepared_statements: Vec<String>,
    fail_begin: bool,
    fail_prepare: bool,
    fail_commit: bool,
    /// Rows containing this cell fail on execute.
    fail_rows_containing: Option<Cell>,
    /// Execute parks forever, simulating a wedged store.
    hang_execute: bool,
}

/// A scriptable in-memory store.
///
/// All connections obtained from a clone of the same [`MemoryStore`] share
/// the committed state, so a test can inspect what its writer workers
/// delivered.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                columns,
                ..Default::default()
            })),
        }
    }

    /// Returns the committed transactions, each an ordered list of rows.
    pub async fn committed_batches(&self) -> Vec<Vec<Vec<Cell>>> {
        self.inner.lock().await.committed.clone()
    }

    /// Returns all committed rows across transactions, in commit order.
    pub async fn committed_rows(&self) -> Vec<Vec<Cell>> {
        self.inner
            .lock()
            .await
            .committed
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Returns the SQL of every statement prepared so far.
    pub async fn prepared_statements(&self) -> Vec<String> {
        self.inner.lock().await.prepared_statements.clone()
    }

    pub async fn fail_begin(&self, fail: bool) {
        self.inner.lock().await.fail_begin = fail;
    }

    pub async fn fail_prepare(&self, fail: bool) {
        self.inner.lock().await.fail_prepare = fail;
    }

    pub async fn fail_commit(&self, fail: bool) {
        self.inner.lock().await.fail_commit = fail;
    }

    /// Makes execute fail for any row containing the given cell.
    pub async fn fail_rows_containing(&self, cell: Option<Cell>) {
        self.inner.lock().await.fail_rows_containing = cell;
    }

    /// Makes execute park forever, simulating a wedged store.
    pub async fn hang_execute(&self, hang: bool) {
        self.inner.lock().await.hang_execute = hang;
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn connect(&self) -> SinkResult<Box<dyn StoreConnection>> {
        Ok(Box::new(MemoryStoreConnection {
            inner: self.inner.clone(),
        }))
    }
}

struct MemoryStoreConnection {
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl StoreConnection for MemoryStoreConnection {
    async fn describe_table(&mut self, table: &str) -> SinkResult<Vec<ColumnDescriptor>> {
        info!("describing table {table} from memory store");
        Ok(self.inner.lock().await.columns.clone())
    }

    async fn begin<'a>(&'a mut self) -> SinkResult<Box<dyn StoreTransaction + Send + 'a>> {
        if self.inner.lock().await.fail_begin {
            return Err(sink_error!(
                ErrorKind::TransactionBeginFailed,
                "Scripted begin failure"
            ));
        }

        Ok(Box::new(MemoryStoreTransaction {
            inner: self.inner.clone(),
            pending: Vec::new(),
            prepared: false,
        }))
    }
}

struct MemoryStoreTransaction {
    inner: Arc<Mutex<Inner>>,
    pending: Vec<Vec<Cell>>,
    prepared: bool,
}

#[async_trait]
impl StoreTransaction for MemoryStoreTransaction {
    async fn prepare(&mut self, sql: &str) -> SinkResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_prepare {
            return Err(sink_error!(
                ErrorKind::StatementPrepareFailed,
                "Scripted prepare failure"
            ));
        }

        inner.prepared_statements.push(sql.to_string());
        self.prepared = true;

        Ok(())
    }

    async fn execute(&mut self, args: &[Cell]) -> SinkResult<()> {
        if !self.prepared {
            return Err(sink_error!(
                ErrorKind::InvalidState,
                "Insert statement executed before being prepared"
            ));
        }

        if self.inner.lock().await.hang_execute {
            // The lock is released before parking so the test can still
            // inspect the store.
            std::future::pending::<()>().await;
        }

        if let Some(poison) = &self.inner.lock().await.fail_rows_containing {
            if args.contains(poison) {
                return Err(sink_error!(
                    ErrorKind::RowInsertFailed,
                    "Scripted row failure"
                ));
            }
        }

        self.pending.push(args.to_vec());

        Ok(())
    }

    async fn commit(self: Box<Self>) -> SinkResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_commit {
            return Err(sink_error!(
                ErrorKind::CommitFailed,
                "Scripted commit failure"
            ));
        }

        inner.committed.push(self.pending);

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> SinkResult<()> {
        // Pending rows are simply discarded.
        Ok(())
    }
}
