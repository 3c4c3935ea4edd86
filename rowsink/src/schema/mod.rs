//! Schema adaptation for the destination table.
//!
//! The resolver introspects the destination table's column definitions once at
//! startup and derives a per-column default value keyed by declared type.
//! Both outputs are immutable for the process lifetime; concurrent workers
//! read them without synchronization.

use std::collections::HashMap;

use chrono::DateTime;
use tracing::{debug, warn};

use crate::error::SinkResult;
use crate::store::StoreConnection;
use crate::types::Cell;

/// Declared type of a destination column, reduced to the shapes the sink can
/// impute a default for.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Text,
    Temporal,
    Integer,
    Float,
    TextArray,
    /// A declared type the sink does not recognize. Values for such columns
    /// pass through as supplied, with no imputed default. The raw type name
    /// is kept for logging.
    Unsupported(String),
}

impl ColumnType {
    /// Maps a declared type from `information_schema.columns` to a [`ColumnType`].
    ///
    /// `data_type` is the standard SQL type name; `udt_name` disambiguates
    /// array element types (`ARRAY` columns report the element type as
    /// `_<element>`).
    pub fn from_declared(data_type: &str, udt_name: &str) -> ColumnType {
        match data_type {
            "text" | "character varying" | "character" => ColumnType::Text,
            "timestamp with time zone" | "timestamp without time zone" | "date" => {
                ColumnType::Temporal
            }
            "smallint" | "integer" | "bigint" => ColumnType::Integer,
            "real" | "double precision" | "numeric" => ColumnType::Float,
            "ARRAY" if matches!(udt_name, "_text" | "_varchar") => ColumnType::TextArray,
            other => ColumnType::Unsupported(other.to_string()),
        }
    }

    /// Returns the type-appropriate zero value for this column type, or `None`
    /// for unsupported types.
    pub fn default_value(&self) -> Option<Cell> {
        match self {
            ColumnType::Text => Some(Cell::String(String::new())),
            ColumnType::Temporal => Some(Cell::TimestampTz(DateTime::UNIX_EPOCH)),
            ColumnType::Integer => Some(Cell::I64(0)),
            ColumnType::Float => Some(Cell::F64(0.0)),
            ColumnType::TextArray => Some(Cell::Array(Vec::new())),
            ColumnType::Unsupported(_) => None,
        }
    }
}

/// Describes a single destination column: name and declared type.
///
/// Loaded once at startup and treated as read-only for the process lifetime.
/// Live schema changes are not supported.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub typ: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, typ: ColumnType) -> Self {
        Self {
            name: name.into(),
            typ,
        }
    }
}

/// Per-column fallback values used when an event omits or nulls a mapped field.
///
/// Columns with unrecognized declared types are excluded; their values pass
/// through as supplied.
#[derive(Debug, Clone, Default)]
pub struct DefaultValueTable {
    defaults: HashMap<String, Cell>,
}

impl DefaultValueTable {
    /// Returns the default value for a column, if one exists.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.defaults.get(column)
    }

    /// Returns the number of columns with an imputed default.
    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

/// Column descriptors and defaults for the destination table.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub columns: Vec<ColumnDescriptor>,
    pub defaults: DefaultValueTable,
}

/// Queries the destination table's column definitions and builds the default
/// value table.
///
/// Fails if the introspection query itself errors; there is no valid degraded
/// mode without knowing the schema, so the caller is expected to abort
/// startup on error.
pub async fn resolve(
    connection: &mut dyn StoreConnection,
    table: &str,
) -> SinkResult<ResolvedSchema> {
    let columns = connection.describe_table(table).await?;

    let mut defaults = HashMap::new();
    for column in &columns {
        match column.typ.default_value() {
            Some(default) => {
                debug!(column = %column.name, ?default, "imputed column default");
                defaults.insert(column.name.clone(), default);
            }
            None => {
                warn!(
                    column = %column.name,
                    typ = ?column.typ,
                    "unsupported column type, no default imputed"
                );
            }
        }
    }

    Ok(ResolvedSchema {
        columns,
        defaults: DefaultValueTable { defaults },
    })
}
