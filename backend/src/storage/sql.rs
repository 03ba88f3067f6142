//! Statement text shared by the SQL variants.
//!
//! Table and column names come from the fixed schema only; values are always
//! bound as parameters.

use shared::Table;
use tokio::runtime::{Builder, Runtime};

use super::error::{BackendKind, StorageError, StorageResult};

/// Single-threaded runtime owned by one SQL handle; every call blocks on it
pub fn blocking_runtime(backend: BackendKind) -> StorageResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            StorageError::connection(backend, format!("could not start I/O runtime: {}", e))
        })
}

fn column_list(table: Table) -> String {
    table
        .columns()
        .iter()
        .map(|column| column.name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_table(table: Table) -> String {
    let columns = table
        .columns()
        .iter()
        .map(|column| format!("{} {}", column.name, column.kind.sql_name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name(), columns)
}

pub fn select_all(table: Table) -> String {
    format!("SELECT {} FROM {}", column_list(table), table.name())
}

pub fn delete_all(table: Table) -> String {
    format!("DELETE FROM {}", table.name())
}

pub fn insert(table: Table) -> String {
    let placeholders = vec!["?"; table.columns().len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name(),
        column_list(table),
        placeholders
    )
}

pub fn delete_by_key(table: Table) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?",
        table.name(),
        table.key_column().name
    )
}
