use bytes::BytesMut;
use chrono::{DateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A single scalar or collection value carried by an [`crate::types::Event`] field.
///
/// [`Cell`] covers the value shapes the sink knows how to bind to an insert
/// statement: strings, numerics, timestamps, and string arrays. A missing or
/// explicit null value is represented by [`Cell::Null`] and replaced with a
/// column default before binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I64(i64),
    F64(f64),
    TimestampTz(DateTime<Utc>),
    Array(Vec<String>),
}

impl Cell {
    /// Returns whether this cell carries no value.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl ToSql for Cell {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(b) => b.to_sql(ty, out),
            Cell::String(s) => s.to_sql(ty, out),
            Cell::I64(i) => i.to_sql(ty, out),
            Cell::F64(f) => f.to_sql(ty, out),
            Cell::TimestampTz(t) => t.to_sql(ty, out),
            Cell::Array(a) => a.to_sql(ty, out),
        }
    }

    // The concrete variant is only known at bind time, so the per-variant
    // check happens in `to_sql` when the inner value is delegated to.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
