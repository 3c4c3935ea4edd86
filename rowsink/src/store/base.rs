use async_trait::async_trait;

use crate::error::SinkResult;
use crate::schema::ColumnDescriptor;
use crate::types::Cell;

/// Factory for store connections.
///
/// The pipeline opens one connection for schema introspection at startup and
/// one per writer worker, so workers can run their transactions in parallel.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Opens a new connection to the store.
    async fn connect(&self) -> SinkResult<Box<dyn StoreConnection>>;
}

/// A single session with the destination store.
///
/// Each writer worker owns exactly one connection and runs one transaction at
/// a time on it.
#[async_trait]
pub trait StoreConnection: Send {
    /// Returns the column definitions of the given table, in declaration order.
    async fn describe_table(&mut self, table: &str) -> SinkResult<Vec<ColumnDescriptor>>;

    /// Begins a transaction on this connection.
    async fn begin<'a>(&'a mut self) -> SinkResult<Box<dyn StoreTransaction + Send + 'a>>;
}

/// An open transaction supporting a single prepared parameterized insert.
///
/// The statement is prepared once per transaction and executed once per row.
/// Dropping the transaction without committing rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Prepares the insert statement for this transaction.
    async fn prepare(&mut self, sql: &str) -> SinkResult<()>;

    /// Executes the prepared statement with the given positional arguments.
    async fn execute(&mut self, args: &[Cell]) -> SinkResult<()>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> SinkResult<()>;

    /// Rolls the transaction back explicitly.
    async fn rollback(self: Box<Self>) -> SinkResult<()>;
}
