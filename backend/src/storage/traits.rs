//! # Storage Traits
//!
//! The contract every storage variant implements. Services never see which
//! medium sits behind it; they exchange raw rows in the fixed column order of
//! each logical table and leave typing to the record model.
//!
//! All operations are synchronous and block the calling thread.

use shared::{Row, Table, Value};

use super::error::StorageResult;

/// Read/replace/insert/delete access to the four logical tables
pub trait StorageBackend {
    /// Ensure every logical table exists, creating missing ones empty.
    /// Safe to call repeatedly; never removes rows.
    fn bootstrap(&mut self) -> StorageResult<()>;

    /// Every row of `table`, in whatever order the medium keeps them
    fn read_all(&mut self, table: Table) -> StorageResult<Vec<Row>>;

    /// Drop every existing row of `table` and write `rows` in the given order.
    /// Rows not present in `rows` are lost.
    fn replace_all(&mut self, table: Table, rows: &[Row]) -> StorageResult<()>;

    /// Append one row without touching the others
    fn insert_one(&mut self, table: Table, row: &[Value]) -> StorageResult<()>;

    /// Remove the rows whose key column equals `id`; no match is not an error
    fn delete_one(&mut self, table: Table, id: i64) -> StorageResult<()>;

    /// Flush pending writes and release the underlying connection or files
    fn close(self) -> StorageResult<()>
    where
        Self: Sized;
}
