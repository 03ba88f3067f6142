use shared::{Row, Table, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row as _, TypeInfo, ValueRef};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::storage::error::{BackendKind, Operation, StorageError, StorageResult};
use crate::storage::traits::StorageBackend;
use crate::storage::{ensure_row_shape, sql};

const KIND: BackendKind = BackendKind::EmbeddedSql;

/// Handle on a local SQLite file, held for one logical operation
pub struct SqliteBackend {
    runtime: Runtime,
    connection: SqliteConnection,
    path: PathBuf,
}

impl SqliteBackend {
    /// Open (creating if needed) the database file and bootstrap the schema
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::connection(KIND, format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let runtime = sql::blocking_runtime(KIND)?;
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let connection = runtime
            .block_on(options.connect())
            .map_err(|e| StorageError::connection(KIND, format!("{}: {}", path.display(), e)))?;

        debug!("Opened SQLite database {}", path.display());

        let mut backend = Self {
            runtime,
            connection,
            path,
        };
        backend.bootstrap()?;
        Ok(backend)
    }
}

fn bind_row<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    row: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in row {
        query = match value {
            Value::Integer(value) => query.bind(*value),
            Value::Real(value) => query.bind(*value),
            Value::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

/// Decode one cell by the storage class SQLite actually holds for it.
/// NULL surfaces as empty text so numeric columns fail record construction.
fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Text(String::new()));
    }
    let storage_class = raw.type_info().name().to_ascii_uppercase();
    match storage_class.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(Value::Integer),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Real),
        _ => row.try_get::<String, _>(index).map(Value::Text),
    }
}

fn decode_row(table: Table, row: &SqliteRow) -> Result<Row, sqlx::Error> {
    (0..table.columns().len())
        .map(|index| decode_cell(row, index))
        .collect()
}

impl StorageBackend for SqliteBackend {
    fn bootstrap(&mut self) -> StorageResult<()> {
        let Self {
            runtime, connection, ..
        } = self;

        for table in Table::ALL {
            let statement = sql::create_table(table);
            runtime
                .block_on(sqlx::query(&statement).execute(&mut *connection))
                .map_err(StorageError::operation(table, Operation::Bootstrap))?;
        }

        info!("SQLite schema ready in {}", self.path.display());
        Ok(())
    }

    fn read_all(&mut self, table: Table) -> StorageResult<Vec<Row>> {
        let Self {
            runtime, connection, ..
        } = self;

        let statement = sql::select_all(table);
        let rows = runtime
            .block_on(sqlx::query(&statement).fetch_all(&mut *connection))
            .map_err(StorageError::operation(table, Operation::ReadAll))?;

        let rows = rows
            .iter()
            .map(|row| decode_row(table, row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::operation(table, Operation::ReadAll))?;

        debug!("Read {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    fn replace_all(&mut self, table: Table, rows: &[Row]) -> StorageResult<()> {
        for row in rows {
            ensure_row_shape(table, row)?;
        }

        let Self {
            runtime, connection, ..
        } = self;

        let delete = sql::delete_all(table);
        let insert = sql::insert(table);
        runtime
            .block_on(async {
                let mut tx = connection.begin().await?;
                sqlx::query(&delete).execute(&mut *tx).await?;
                for row in rows {
                    bind_row(sqlx::query(&insert), row).execute(&mut *tx).await?;
                }
                tx.commit().await
            })
            .map_err(StorageError::operation(table, Operation::ReplaceAll))?;

        debug!("Replaced {} with {} rows", table, rows.len());
        Ok(())
    }

    fn insert_one(&mut self, table: Table, row: &[Value]) -> StorageResult<()> {
        ensure_row_shape(table, row)?;

        let Self {
            runtime, connection, ..
        } = self;

        let insert = sql::insert(table);
        runtime
            .block_on(bind_row(sqlx::query(&insert), row).execute(&mut *connection))
            .map_err(StorageError::operation(table, Operation::InsertOne))?;

        debug!("Inserted one row into {}", table);
        Ok(())
    }

    fn delete_one(&mut self, table: Table, id: i64) -> StorageResult<()> {
        let Self {
            runtime, connection, ..
        } = self;

        let delete = sql::delete_by_key(table);
        let result = runtime
            .block_on(sqlx::query(&delete).bind(id).execute(&mut *connection))
            .map_err(StorageError::operation(table, Operation::DeleteOne))?;

        debug!("Deleted {} rows from {} with id {}", result.rows_affected(), table, id);
        Ok(())
    }

    fn close(self) -> StorageResult<()> {
        let Self {
            runtime, connection, ..
        } = self;
        runtime
            .block_on(connection.close())
            .map_err(StorageError::close(KIND))
    }
}
