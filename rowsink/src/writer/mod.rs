//! Transactional batch delivery.
//!
//! A batch is written inside a single transaction: the insert statement is
//! prepared once, every row is bound in the fixed field order and executed,
//! and the transaction is committed. One bad row does not abort the batch;
//! begin, prepare, and commit failures drop it. A batch is attempted exactly
//! once and never re-enqueued.

use std::fmt::Write as _;

use pg_escape::quote_identifier;
use tracing::{info, warn};

use crate::error::SinkResult;
use crate::schema::DefaultValueTable;
use crate::store::StoreConnection;
use crate::types::{Batch, Cell, Event};

/// The fixed parameterized insert statement for the destination table.
///
/// Built once from the configured table name and the ordered field list, and
/// prepared anew inside every transaction. The field order is fixed at
/// construction and identical for every event in every batch.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    fields: Vec<String>,
    sql: String,
}

impl InsertPlan {
    pub fn new(table: &str, fields: &[String]) -> Self {
        let mut columns = String::new();
        let mut placeholders = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                columns.push(',');
                placeholders.push(',');
            }
            columns.push_str(&quote_identifier(field));
            let _ = write!(placeholders, "${}", i + 1);
        }

        let sql = format!(
            "insert into {} ({columns}) values ({placeholders})",
            quote_identifier(table)
        );

        Self {
            fields: fields.to_vec(),
            sql,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Builds the positional argument list for one event.
    ///
    /// For each field in order: a present non-null value is used as supplied;
    /// a null or absent value is replaced with the column default when one
    /// exists, and with an empty string otherwise.
    pub fn bind_row(&self, event: &Event, defaults: &DefaultValueTable) -> Vec<Cell> {
        self.fields
            .iter()
            .map(|field| match event.get(field) {
                Some(cell) if !cell.is_null() => cell.clone(),
                _ => defaults
                    .get(field)
                    .cloned()
                    .unwrap_or_else(|| Cell::String(String::new())),
            })
            .collect()
    }
}

/// Writes one batch to the store inside a transaction.
///
/// Per-row execution failures are logged and skipped; the transaction still
/// commits for the remaining rows. Begin and prepare failures roll back and
/// propagate, as does a commit failure. The caller drops the batch on error;
/// there is no retry.
pub async fn write_batch(
    connection: &mut dyn StoreConnection,
    plan: &InsertPlan,
    defaults: &DefaultValueTable,
    batch: &Batch,
) -> SinkResult<usize> {
    info!("writing {} events to the store", batch.len());

    let mut transaction = connection.begin().await?;

    if let Err(err) = transaction.prepare(plan.sql()).await {
        let _ = transaction.rollback().await;
        return Err(err);
    }

    let mut inserted = 0;
    for event in batch {
        let args = plan.bind_row(event, defaults);
        match transaction.execute(&args).await {
            Ok(()) => inserted += 1,
            Err(err) => {
                warn!("row insert failed, skipping row: {err}");
            }
        }
    }

    transaction.commit().await?;

    info!("{inserted} of {} events committed to the store", batch.len());

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::{ColumnDescriptor, ColumnType};
    use crate::store::StoreClient;
    use crate::store::memory::MemoryStore;

    fn plan() -> InsertPlan {
        InsertPlan::new("logs", &["a".to_string(), "b".to_string()])
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            ColumnDescriptor::new("a", ColumnType::Integer),
            ColumnDescriptor::new("b", ColumnType::Text),
        ])
    }

    async fn defaults(store: &MemoryStore) -> DefaultValueTable {
        let mut connection = store.connect().await.unwrap();
        crate::schema::resolve(&mut *connection, "logs")
            .await
            .unwrap()
            .defaults
    }

    fn event(a: i64, b: Option<&str>) -> Event {
        let mut event = Event::new();
        event.set("a", Cell::I64(a));
        match b {
            Some(b) => event.set("b", Cell::String(b.to_string())),
            None => event.set("b", Cell::Null),
        }
        event
    }

    #[test]
    fn test_insert_statement_shape() {
        assert_eq!(
            plan().sql(),
            "insert into logs (a,b) values ($1,$2)"
        );
    }

    #[test]
    fn test_reserved_identifiers_are_quoted() {
        let plan = InsertPlan::new("weird table", &["select".to_string()]);
        assert!(plan.sql().contains(r#""weird table""#));
        assert!(plan.sql().contains(r#""select""#));
    }

    #[tokio::test]
    async fn test_bind_row_uses_defaults_for_null_and_absent() {
        let store = store();
        let defaults = defaults(&store).await;
        let plan = plan();

        // Present and non-null: used as supplied.
        let args = plan.bind_row(&event(7, Some("x")), &defaults);
        assert_eq!(args, vec![Cell::I64(7), Cell::String("x".to_string())]);

        // Present and null: the column default applies.
        let args = plan.bind_row(&event(7, None), &defaults);
        assert_eq!(args, vec![Cell::I64(7), Cell::String(String::new())]);

        // Absent entirely: the column default applies too.
        let mut partial = Event::new();
        partial.set("b", Cell::String("y".to_string()));
        let args = plan.bind_row(&partial, &defaults);
        assert_eq!(args, vec![Cell::I64(0), Cell::String("y".to_string())]);
    }

    #[tokio::test]
    async fn test_bind_row_without_default_falls_back_to_empty_string() {
        let plan = InsertPlan::new("logs", &["c".to_string()]);

        let args = plan.bind_row(&Event::new(), &DefaultValueTable::default());
        assert_eq!(args, vec![Cell::String(String::new())]);
    }

    #[tokio::test]
    async fn test_batch_committed() {
        let store = store();
        let defaults = defaults(&store).await;
        let mut connection = store.connect().await.unwrap();

        let batch = vec![event(1, Some("x")), event(2, None)];
        let inserted = write_batch(&mut *connection, &plan(), &defaults, &batch)
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        let batches = store.committed_batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(
            batches[0][1],
            vec![Cell::I64(2), Cell::String(String::new())]
        );
    }

    #[tokio::test]
    async fn test_row_failure_does_not_abort_batch() {
        let store = store();
        store.fail_rows_containing(Some(Cell::I64(2))).await;
        let defaults = defaults(&store).await;
        let mut connection = store.connect().await.unwrap();

        let batch = vec![event(1, Some("x")), event(2, Some("y")), event(3, Some("z"))];
        let inserted = write_batch(&mut *connection, &plan(), &defaults, &batch)
            .await
            .unwrap();

        // Row 2 fails, rows 1 and 3 still land and the transaction commits.
        assert_eq!(inserted, 2);
        let rows = store.committed_rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Cell::I64(1));
        assert_eq!(rows[1][0], Cell::I64(3));
    }

    #[tokio::test]
    async fn test_prepare_failure_drops_batch() {
        let store = store();
        store.fail_prepare(true).await;
        let defaults = defaults(&store).await;
        let mut connection = store.connect().await.unwrap();

        let batch = vec![event(1, Some("x"))];
        let err = write_batch(&mut *connection, &plan(), &defaults, &batch)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StatementPrepareFailed);
        assert!(store.committed_rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_propagates() {
        let store = store();
        store.fail_commit(true).await;
        let defaults = defaults(&store).await;
        let mut connection = store.connect().await.unwrap();

        let batch = vec![event(1, Some("x"))];
        let err = write_batch(&mut *connection, &plan(), &defaults, &batch)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitFailed);
        assert!(store.committed_rows().await.is_empty());
    }
}
