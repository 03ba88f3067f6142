use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use shared::{Row, Table, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::connection::{CsvConnection, TableFile};
use crate::storage::error::{BackendKind, Operation, StorageError, StorageResult};
use crate::storage::ensure_row_shape;
use crate::storage::traits::StorageBackend;

const KIND: BackendKind = BackendKind::DelimitedText;

/// Delimited-text variant: every call opens the table file, does its work
/// and closes it again
#[derive(Debug, Clone)]
pub struct CsvBackend {
    connection: CsvConnection,
}

impl CsvBackend {
    /// Open the data directory and make sure every table file exists
    pub fn open<P: AsRef<Path>>(directory: P) -> StorageResult<Self> {
        let directory = directory.as_ref();
        let connection = CsvConnection::new(directory).map_err(|e| {
            StorageError::connection(KIND, format!("{}: {}", directory.display(), e))
        })?;

        let mut backend = Self { connection };
        backend.bootstrap()?;
        Ok(backend)
    }

    pub fn connection(&self) -> &CsvConnection {
        &self.connection
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.is_empty() || (record.len() == 1 && record[0].trim().is_empty())
}

/// Parse delimited rows; blank lines are skipped and every field stays text
pub(crate) fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<Row>, csv::Error> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        rows.push(record.iter().map(Value::from).collect());
    }
    Ok(rows)
}

/// Write rows comma-separated, one per line, `\n` terminated
pub(crate) fn write_rows<'a, W, I>(writer: W, rows: I) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a [Value]>,
{
    let mut csv_writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    for row in rows {
        csv_writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl CsvBackend {
    fn open_read(&self, table: Table, operation: Operation) -> StorageResult<BufReader<File>> {
        self.connection
            .open_for_read(table)
            .map(BufReader::new)
            .map_err(StorageError::operation(table, operation))
    }
}

impl StorageBackend for CsvBackend {
    fn bootstrap(&mut self) -> StorageResult<()> {
        for table in Table::ALL {
            let state = self
                .connection
                .ensure_table_file(table)
                .map_err(StorageError::operation(table, Operation::Bootstrap))?;
            if state == TableFile::Created {
                let path = self.connection.table_file_path(table);
                info!("Created empty table file {}", path.display());
            }
        }
        Ok(())
    }

    fn read_all(&mut self, table: Table) -> StorageResult<Vec<Row>> {
        let reader = self.open_read(table, Operation::ReadAll)?;
        let rows = read_rows(reader).map_err(StorageError::operation(table, Operation::ReadAll))?;
        let path = self.connection.table_file_path(table);
        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    fn replace_all(&mut self, table: Table, rows: &[Row]) -> StorageResult<()> {
        for row in rows {
            ensure_row_shape(table, row)?;
        }

        let file = self
            .connection
            .open_truncated(table)
            .map_err(StorageError::operation(table, Operation::ReplaceAll))?;
        let mut writer = BufWriter::new(file);
        write_rows(&mut writer, rows.iter().map(|row| row.as_slice()))
            .map_err(StorageError::operation(table, Operation::ReplaceAll))?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(StorageError::operation(table, Operation::ReplaceAll))?;

        debug!("Replaced {} with {} rows", table, rows.len());
        Ok(())
    }

    fn insert_one(&mut self, table: Table, row: &[Value]) -> StorageResult<()> {
        ensure_row_shape(table, row)?;

        let file = self
            .connection
            .open_for_append(table)
            .map_err(StorageError::operation(table, Operation::InsertOne))?;
        let mut writer = BufWriter::new(file);
        write_rows(&mut writer, [row])
            .map_err(StorageError::operation(table, Operation::InsertOne))?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(StorageError::operation(table, Operation::InsertOne))?;

        debug!("Appended one row to {}", table);
        Ok(())
    }

    fn delete_one(&mut self, table: Table, id: i64) -> StorageResult<()> {
        let reader = self.open_read(table, Operation::DeleteOne)?;
        let rows = read_rows(reader).map_err(StorageError::operation(table, Operation::DeleteOne))?;

        let key = id.to_string();
        let before = rows.len();
        let kept: Vec<Row> = rows
            .into_iter()
            .filter(|row| row.first().map(|cell| cell.to_string().trim() != key).unwrap_or(true))
            .collect();

        if kept.len() == before {
            debug!("No row with id {} in {}", id, table);
            return Ok(());
        }

        let file = self
            .connection
            .open_truncated(table)
            .map_err(StorageError::operation(table, Operation::DeleteOne))?;
        let mut writer = BufWriter::new(file);
        write_rows(&mut writer, kept.iter().map(|row| row.as_slice()))
            .map_err(StorageError::operation(table, Operation::DeleteOne))?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(StorageError::operation(table, Operation::DeleteOne))?;

        debug!("Deleted {} rows from {} with id {}", before - kept.len(), table, id);
        Ok(())
    }

    /// Files are flushed and closed by each call already
    fn close(self) -> StorageResult<()> {
        Ok(())
    }
}
