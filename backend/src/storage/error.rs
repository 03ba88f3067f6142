//! # Storage Errors
//!
//! Failures raised by the storage layer. Every error is returned to the calling
//! service; no backend retries a statement or falls back to another variant.

use shared::{RecordError, Table};
use std::fmt;

pub type StorageResult<T> = Result<T, StorageError>;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Which storage medium a backend writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local SQLite file
    EmbeddedSql,
    /// Remote MySQL server
    NetworkedSql,
    /// One comma-separated file per table
    DelimitedText,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::EmbeddedSql => "embedded SQL",
            BackendKind::NetworkedSql => "networked SQL",
            BackendKind::DelimitedText => "delimited text",
        };
        f.write_str(name)
    }
}

/// The contract operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Bootstrap,
    ReadAll,
    ReplaceAll,
    InsertOne,
    DeleteOne,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Bootstrap => "bootstrap",
            Operation::ReadAll => "read",
            Operation::ReplaceAll => "save",
            Operation::InsertOne => "insert",
            Operation::DeleteOne => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be opened; the instance is unusable
    #[error("could not connect to {backend} storage: {reason}")]
    Connection { backend: BackendKind, reason: String },

    /// A statement against an open backend failed
    #[error("{operation} failed on table {table}: {source}")]
    Operation {
        table: Table,
        operation: Operation,
        #[source]
        source: Source,
    },

    /// Pending writes could not be flushed while releasing the handle
    #[error("could not close {backend} storage: {source}")]
    Close {
        backend: BackendKind,
        #[source]
        source: Source,
    },

    /// A row could not be turned into a record, or has the wrong shape for its table
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl StorageError {
    pub fn connection(backend: BackendKind, reason: impl fmt::Display) -> Self {
        StorageError::Connection {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Build a mapper that wraps a low-level error with the table and operation
    pub fn operation<E>(table: Table, operation: Operation) -> impl FnOnce(E) -> Self
    where
        E: Into<Source>,
    {
        move |source| StorageError::Operation {
            table,
            operation,
            source: source.into(),
        }
    }

    pub fn close<E>(backend: BackendKind) -> impl FnOnce(E) -> Self
    where
        E: Into<Source>,
    {
        move |source| StorageError::Close {
            backend,
            source: source.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_operation_error_names_table_and_operation() {
        let err = StorageError::operation(Table::Inventory, Operation::ReplaceAll)(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "read-only file",
        ));
        assert_eq!(err.to_string(), "save failed on table Inventory: read-only file");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_connection_error_message() {
        let err = StorageError::connection(BackendKind::NetworkedSql, "access denied");
        assert!(err.is_connection());
        assert_eq!(err.to_string(), "could not connect to networked SQL storage: access denied");
    }
}
