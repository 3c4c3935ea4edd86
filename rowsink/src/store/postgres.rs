//! Postgres-protocol implementation of the store contract.

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement, Transaction};
use tracing::{debug, warn};

use crate::error::{ErrorKind, SinkError, SinkResult};
use crate::schema::{ColumnDescriptor, ColumnType};
use crate::sink_error;
use crate::store::base::{StoreClient, StoreConnection, StoreTransaction};
use crate::types::Cell;

/// Introspection query returning the destination table's columns in
/// declaration order.
const DESCRIBE_TABLE_QUERY: &str = "select column_name, data_type, udt_name \
     from information_schema.columns \
     where table_name = $1 \
     order by ordinal_position";

/// Connects to the store endpoint chosen at startup.
///
/// Every [`StoreClient::connect`] call opens a fresh session against the same
/// endpoint; host selection happens once, before this client is built.
#[derive(Debug, Clone)]
pub struct PgStoreClient {
    connection_string: String,
}

impl PgStoreClient {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

#[async_trait]
impl StoreClient for PgStoreClient {
    async fn connect(&self) -> SinkResult<Box<dyn StoreConnection>> {
        let (client, connection) = tokio_postgres::connect(&self.connection_string, NoTls)
            .await
            .map_err(|err| {
                sink_error!(
                    ErrorKind::StoreConnectionFailed,
                    "Failed to connect to the store",
                    err
                )
            })?;

        // The connection object drives the socket and must be polled for the
        // client to make progress.
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                warn!("store connection closed with error: {err}");
            }
        });

        debug!("opened store connection");

        Ok(Box::new(PgStoreConnection { client }))
    }
}

/// A single Postgres session.
pub struct PgStoreConnection {
    client: Client,
}

#[async_trait]
impl StoreConnection for PgStoreConnection {
    async fn describe_table(&mut self, table: &str) -> SinkResult<Vec<ColumnDescriptor>> {
        let rows = self
            .client
            .query(DESCRIBE_TABLE_QUERY, &[&table])
            .await
            .map_err(|err| {
                sink_error!(
                    ErrorKind::SchemaIntrospectionFailed,
                    "Failed to introspect destination table",
                    err
                )
            })?;

        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.get(0);
                let data_type: String = row.get(1);
                let udt_name: String = row.get(2);
                ColumnDescriptor::new(name, ColumnType::from_declared(&data_type, &udt_name))
            })
            .collect();

        Ok(columns)
    }

    async fn begin<'a>(&'a mut self) -> SinkResult<Box<dyn StoreTransaction + Send + 'a>> {
        let transaction = self.client.transaction().await.map_err(|err| {
            sink_error!(
                ErrorKind::TransactionBeginFailed,
                "Failed to begin transaction",
                err
            )
        })?;

        Ok(Box::new(PgStoreTransaction {
            transaction,
            statement: None,
        }))
    }
}

/// An open Postgres transaction with at most one prepared insert statement.
pub struct PgStoreTransaction<'a> {
    transaction: Transaction<'a>,
    statement: Option<Statement>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction<'_> {
    async fn prepare(&mut self, sql: &str) -> SinkResult<()> {
        let statement = self.transaction.prepare(sql).await.map_err(|err| {
            sink_error!(
                ErrorKind::StatementPrepareFailed,
                "Failed to prepare insert statement",
                err
            )
        })?;

        self.statement = Some(statement);

        Ok(())
    }

    async fn execute(&mut self, args: &[Cell]) -> SinkResult<()> {
        let Some(statement) = self.statement.as_ref() else {
            return Err(sink_error!(
                ErrorKind::InvalidState,
                "Insert statement executed before being prepared"
            ));
        };

        let params: Vec<&(dyn ToSql + Sync)> =
            args.iter().map(|cell| cell as &(dyn ToSql + Sync)).collect();

        self.transaction
            .execute(statement, &params)
            .await
            .map_err(|err| {
                sink_error!(ErrorKind::RowInsertFailed, "Failed to insert row", err)
            })?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> SinkResult<()> {
        self.transaction.commit().await.map_err(|err| {
            sink_error!(ErrorKind::CommitFailed, "Failed to commit transaction", err)
        })
    }

    async fn rollback(self: Box<Self>) -> SinkResult<()> {
        self.transaction.rollback().await.map_err(|err| {
            sink_error!(
                ErrorKind::StoreQueryFailed,
                "Failed to roll back transaction",
                err
            )
        })
    }
}
