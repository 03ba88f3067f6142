use shared::{ColumnType, Row, Table, Value};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, Connection, Row as _};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::RemoteSettings;
use crate::storage::error::{BackendKind, Operation, StorageError, StorageResult};
use crate::storage::traits::StorageBackend;
use crate::storage::{ensure_row_shape, sql};

const KIND: BackendKind = BackendKind::NetworkedSql;

/// Handle on a remote MySQL database, held for one logical operation
pub struct MySqlBackend {
    runtime: Runtime,
    connection: MySqlConnection,
    address: String,
}

impl MySqlBackend {
    /// Connect to the configured server. Any failure here leaves no usable backend.
    pub fn open(settings: &RemoteSettings) -> StorageResult<Self> {
        let address = format!("{}:{}/{}", settings.host, settings.port, settings.database);
        let runtime = sql::blocking_runtime(KIND)?;

        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.username)
            .password(&settings.password)
            .database(&settings.database);
        let timeout = Duration::from_secs(settings.connect_timeout_secs.max(1));

        let connection = runtime
            .block_on(async { tokio::time::timeout(timeout, options.connect()).await })
            .map_err(|_| {
                StorageError::connection(
                    KIND,
                    format!("{}: no answer after {}s", address, timeout.as_secs()),
                )
            })?
            .map_err(|e| {
                warn!("Remote database {} refused connection: {}", address, e);
                StorageError::connection(KIND, format!("{}: {}", address, e))
            })?;

        info!("Connected to remote database {}", address);

        let mut backend = Self {
            runtime,
            connection,
            address,
        };
        backend.bootstrap()?;
        Ok(backend)
    }
}

fn bind_row<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    row: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for value in row {
        query = match value {
            Value::Integer(value) => query.bind(*value),
            Value::Real(value) => query.bind(*value),
            Value::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

/// Decode by the declared column type of the fixed schema.
/// NULL surfaces as empty text so numeric columns fail record construction.
fn decode_row(table: Table, row: &MySqlRow) -> Result<Row, sqlx::Error> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let value = match column.kind {
                ColumnType::Integer => row.try_get::<Option<i64>, _>(index)?.map(Value::Integer),
                ColumnType::Real => row.try_get::<Option<f64>, _>(index)?.map(Value::Real),
                ColumnType::Text => row.try_get::<Option<String>, _>(index)?.map(Value::Text),
            };
            Ok(value.unwrap_or_else(|| Value::Text(String::new())))
        })
        .collect()
}

impl StorageBackend for MySqlBackend {
    /// The remote schema is provisioned outside the application
    fn bootstrap(&mut self) -> StorageResult<()> {
        debug!("Skipping schema bootstrap for remote database {}", self.address);
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

        debug!("Read {} rows from remote {}", rows.len(), table);
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

        debug!("Replaced remote {} with {} rows", table, rows.len());
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

        debug!("Inserted one row into remote {}", table);
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

        debug!("Deleted {} rows from remote {} with id {}", result.rows_affected(), table, id);
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
