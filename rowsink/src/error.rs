use std::error;
use std::fmt;

/// Convenient result type for sink operations using [`SinkError`] as the error type.
///
/// This type alias reduces boilerplate when working with fallible sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Main error type for sink operations.
///
/// [`SinkError`] can represent single errors, errors with additional detail, or
/// multiple aggregated errors, while exposing a unified [`ErrorKind`] based
/// interface for error handling decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
///
/// Users should not interact with this type directly but use [`SinkError`] methods instead.
#[derive(Debug, Clone, PartialEq)]
enum ErrorRepr {
    /// Error with kind and static description
    WithDescription(ErrorKind, &'static str),
    /// Error with kind, static description, and dynamic detail
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    /// Multiple aggregated errors
    Many(Vec<SinkError>),
}

/// Specific categories of errors that can occur during sink operations.
///
/// Error kinds are organized by functional area and failure mode so callers
/// can decide whether a failure is fatal for the process, the batch, or a
/// single row.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,
    ValidationError,

    // Connection & Introspection Errors
    StoreConnectionFailed,
    SchemaIntrospectionFailed,

    // Delivery Errors
    StoreQueryFailed,
    TransactionBeginFailed,
    StatementPrepareFailed,
    RowInsertFailed,
    CommitFailed,

    // Pipeline Errors
    DispatchQueueClosed,
    InvalidState,

    // Data Errors
    DeserializationError,

    // Unknown / Uncategorized
    Unknown,
}

impl SinkError {
    /// Creates a [`SinkError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<SinkError>) -> SinkError {
        SinkError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    ///
    /// For single errors, returns a vector with one element. For multiple errors,
    /// returns a flattened vector of all error kinds.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the dynamic detail of this error, if any.
    ///
    /// For multiple errors, returns the first detail found.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescription(_, _) => None,
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|err| err.detail()),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                write!(f, "{kind:?}: {desc}")
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                write!(f, "{kind:?}: {desc}: {detail}")
            }
            ErrorRepr::Many(ref errors) => {
                write!(f, "Multiple errors ({} total)", errors.len())?;
                for err in errors {
                    write!(f, "; {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl error::Error for SinkError {}

impl From<(ErrorKind, &'static str)> for SinkError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> SinkError {
        SinkError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for SinkError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> SinkError {
        SinkError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl From<Vec<SinkError>> for SinkError {
    fn from(errors: Vec<SinkError>) -> SinkError {
        SinkError::many(errors)
    }
}

/// Converts [`tokio_postgres::Error`] to [`SinkError`] with [`ErrorKind::StoreQueryFailed`].
///
/// The transaction helpers attach a more precise kind (begin/prepare/commit)
/// at the call site where the phase is known.
impl From<tokio_postgres::Error> for SinkError {
    fn from(err: tokio_postgres::Error) -> SinkError {
        SinkError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::StoreQueryFailed,
                "Store operation failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`SinkError`] with [`ErrorKind::DeserializationError`].
impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> SinkError {
        SinkError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts configuration [`rowsink_config::shared::ValidationError`] to [`SinkError`]
/// with [`ErrorKind::ValidationError`].
impl From<rowsink_config::shared::ValidationError> for SinkError {
    fn from(err: rowsink_config::shared::ValidationError) -> SinkError {
        SinkError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ValidationError,
                "Invalid sink configuration",
                err.to_string(),
            ),
        }
    }
}
