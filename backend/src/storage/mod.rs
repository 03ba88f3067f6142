//! # Storage Module
//!
//! One contract, [`StorageBackend`], over three interchangeable media:
//!
//! - [`SqliteBackend`]: embedded SQL file
//! - [`MySqlBackend`]: networked SQL server
//! - [`CsvBackend`]: one delimited text file per table
//!
//! Handles are short-lived. [`Storage`] resolves the configured variant and
//! scopes each handle to a single logical operation, closing it on every exit
//! path. Backends exchange raw [`Row`](shared::Row)s; typed records are built
//! by the callers.

pub mod connection;
pub mod csv;
pub mod error;
pub mod mysql;
pub mod sql;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

use shared::{RecordError, Table, Value};

pub use connection::{Backend, Storage};
pub use csv::CsvBackend;
pub use error::{BackendKind, Operation, StorageError, StorageResult};
pub use mysql::MySqlBackend;
pub use sqlite::SqliteBackend;
pub use traits::StorageBackend;

/// Reject a row whose width does not match the table before anything is written
pub(crate) fn ensure_row_shape(table: Table, row: &[Value]) -> StorageResult<()> {
    let expected = table.columns().len();
    if row.len() != expected {
        return Err(RecordError::FieldCount {
            table,
            expected,
            found: row.len(),
        }
        .into());
    }
    Ok(())
}
