//! # Backend Selection
//!
//! [`Storage`] turns the loaded settings into a live [`Backend`] handle for one
//! logical operation at a time. Nothing is pooled or kept open between calls.

use shared::{validate_keys, Record, RecordError, Row, Table, Value};
use tracing::{debug, warn};

use super::csv::CsvBackend;
use super::error::{BackendKind, StorageError, StorageResult};
use super::mysql::MySqlBackend;
use super::sqlite::SqliteBackend;
use super::traits::StorageBackend;
use crate::config::{AppConfig, DatabaseKind, LocalSettings, RemoteSettings, TextSettings};

/// The closed set of storage variants
pub enum Backend {
    EmbeddedSql(SqliteBackend),
    NetworkedSql(MySqlBackend),
    DelimitedText(CsvBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::EmbeddedSql(_) => BackendKind::EmbeddedSql,
            Backend::NetworkedSql(_) => BackendKind::NetworkedSql,
            Backend::DelimitedText(_) => BackendKind::DelimitedText,
        }
    }
}

impl StorageBackend for Backend {
    fn bootstrap(&mut self) -> StorageResult<()> {
        match self {
            Backend::EmbeddedSql(backend) => backend.bootstrap(),
            Backend::NetworkedSql(backend) => backend.bootstrap(),
            Backend::DelimitedText(backend) => backend.bootstrap(),
        }
    }

    fn read_all(&mut self, table: Table) -> StorageResult<Vec<Row>> {
        match self {
            Backend::EmbeddedSql(backend) => backend.read_all(table),
            Backend::NetworkedSql(backend) => backend.read_all(table),
            Backend::DelimitedText(backend) => backend.read_all(table),
        }
    }

    fn replace_all(&mut self, table: Table, rows: &[Row]) -> StorageResult<()> {
        match self {
            Backend::EmbeddedSql(backend) => backend.replace_all(table, rows),
            Backend::NetworkedSql(backend) => backend.replace_all(table, rows),
            Backend::DelimitedText(backend) => backend.replace_all(table, rows),
        }
    }

    fn insert_one(&mut self, table: Table, row: &[Value]) -> StorageResult<()> {
        match self {
            Backend::EmbeddedSql(backend) => backend.insert_one(table, row),
            Backend::NetworkedSql(backend) => backend.insert_one(table, row),
            Backend::DelimitedText(backend) => backend.insert_one(table, row),
        }
    }

    fn delete_one(&mut self, table: Table, id: i64) -> StorageResult<()> {
        match self {
            Backend::EmbeddedSql(backend) => backend.delete_one(table, id),
            Backend::NetworkedSql(backend) => backend.delete_one(table, id),
            Backend::DelimitedText(backend) => backend.delete_one(table, id),
        }
    }

    fn close(self) -> StorageResult<()> {
        match self {
            Backend::EmbeddedSql(backend) => backend.close(),
            Backend::NetworkedSql(backend) => backend.close(),
            Backend::DelimitedText(backend) => backend.close(),
        }
    }
}

/// Decode raw rows into typed records, failing on the first bad row
pub fn decode_rows<R: Record>(rows: &[Row]) -> StorageResult<Vec<R>> {
    rows.iter()
        .map(|row| R::from_row(row).map_err(StorageError::from))
        .collect()
}

/// Attribute tuples of `records`, in order
pub fn encode_records<R: Record>(records: &[R]) -> Vec<Row> {
    records.iter().map(Record::attributes).collect()
}

/// Backend selector built from the settings file
#[derive(Debug, Clone)]
pub struct Storage {
    kind: DatabaseKind,
    local: LocalSettings,
    remote: RemoteSettings,
    text: TextSettings,
}

impl Storage {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            kind: config.database_kind(),
            local: config.local.clone(),
            remote: config.remote.clone(),
            text: config.text.clone(),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    /// Open a fresh handle on the configured variant, bootstrapped and ready.
    /// A failure here is fatal for the operation; there is no fallback variant.
    pub fn open(&self) -> StorageResult<Backend> {
        debug!("Opening {} storage", self.kind.backend_kind());
        let backend = match self.kind {
            DatabaseKind::Local => Backend::EmbeddedSql(SqliteBackend::open(&self.local.path)?),
            DatabaseKind::Remote => Backend::NetworkedSql(MySqlBackend::open(&self.remote)?),
            DatabaseKind::Text => Backend::DelimitedText(CsvBackend::open(&self.text.directory)?),
        };
        Ok(backend)
    }

    /// Run `work` against a handle that is closed afterwards on every path.
    ///
    /// If `work` fails its error is returned and a close failure is only
    /// logged; otherwise a close failure is the result.
    pub fn session<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Backend) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut backend = self.open()?;
        match work(&mut backend) {
            Ok(value) => {
                backend.close()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(close_error) = backend.close() {
                    warn!("Failed to close storage after error: {}", close_error);
                }
                Err(e)
            }
        }
    }

    pub fn read_records<R: Record>(&self) -> StorageResult<Vec<R>> {
        let rows = self.session(|backend| backend.read_all(R::TABLE))?;
        decode_rows(&rows)
    }

    /// Save the complete collection, replacing whatever the table held.
    /// Collections with a non-positive identifier or a repeated key are rejected
    /// before the store is opened.
    pub fn replace_records<R: Record>(&self, records: &[R]) -> StorageResult<()> {
        validate_keys(records)?;
        let rows = encode_records(records);
        self.session(|backend| backend.replace_all(R::TABLE, &rows))
    }

    /// Append one record whose key is not stored yet
    pub fn insert_record<R: Record>(&self, record: &R) -> StorageResult<()> {
        validate_keys(std::slice::from_ref(record))?;
        let row = record.attributes();
        self.session(|backend| {
            let existing: Vec<R> = decode_rows(&backend.read_all(R::TABLE)?)?;
            let key = record.key();
            if existing.iter().any(|stored| stored.key() == key) {
                return Err(StorageError::from(RecordError::duplicate_key(R::TABLE, &key)));
            }
            backend.insert_one(R::TABLE, &row)
        })
    }

    pub fn delete_record<R: Record>(&self, id: i64) -> StorageResult<()> {
        self.session(|backend| backend.delete_one(R::TABLE, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;
    use shared::{Customer, Item, OrderLine};

    fn customer(id: i64, firstname: &str) -> Customer {
        Customer {
            id,
            firstname: firstname.to_string(),
            surname: "Jones".to_string(),
            contact: "07700 900123".to_string(),
            address: "2 Mill Lane".to_string(),
        }
    }

    #[test]
    fn test_selector_follows_configured_kind() {
        let env = TestEnvironment::new().unwrap();

        let storage = Storage::new(&env.config(DatabaseKind::Text));
        assert_eq!(storage.open().unwrap().kind(), BackendKind::DelimitedText);

        let storage = Storage::new(&env.config(DatabaseKind::Local));
        assert_eq!(storage.open().unwrap().kind(), BackendKind::EmbeddedSql);
    }

    #[test]
    fn test_typed_round_trip_on_every_local_variant() {
        let env = TestEnvironment::new().unwrap();
        for kind in [DatabaseKind::Local, DatabaseKind::Text] {
            let storage = Storage::new(&env.config(kind));
            let customers = vec![customer(1, "Ann"), customer(2, "Bob")];

            storage.replace_records(&customers).unwrap();
            assert_eq!(storage.read_records::<Customer>().unwrap(), customers, "{kind}");

            storage.insert_record(&customer(3, "Cat")).unwrap();
            storage.delete_record::<Customer>(1).unwrap();
            let ids: Vec<i64> = storage
                .read_records::<Customer>()
                .unwrap()
                .iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(ids, vec![2, 3], "{kind}");
        }
    }

    #[test]
    fn test_duplicate_keys_are_rejected_before_writing() {
        let env = TestEnvironment::new().unwrap();
        for kind in [DatabaseKind::Local, DatabaseKind::Text] {
            let storage = Storage::new(&env.config(kind));
            storage.replace_records(&[customer(1, "Ann")]).unwrap();

            let err = storage
                .replace_records(&[customer(2, "Bob"), customer(2, "Bea")])
                .unwrap_err();
            assert!(
                matches!(err, StorageError::Record(RecordError::DuplicateKey { .. })),
                "{kind}: {err}"
            );

            let err = storage.insert_record(&customer(1, "Ada")).unwrap_err();
            assert!(
                matches!(err, StorageError::Record(RecordError::DuplicateKey { .. })),
                "{kind}: {err}"
            );

            let err = storage.insert_record(&customer(-4, "Neg")).unwrap_err();
            assert!(
                matches!(err, StorageError::Record(RecordError::InvalidIdentifier { id: -4, .. })),
                "{kind}: {err}"
            );

            assert_eq!(storage.read_records::<Customer>().unwrap(), vec![customer(1, "Ann")]);
        }
    }

    #[test]
    fn test_order_lines_share_an_order_id() {
        let env = TestEnvironment::new().unwrap();
        for kind in [DatabaseKind::Local, DatabaseKind::Text] {
            let storage = Storage::new(&env.config(kind));
            let line = |item_id| OrderLine { order_id: 1, item_id, quantity: 1 };

            storage.replace_records(&[line(1)]).unwrap();
            storage.insert_record(&line(2)).unwrap();
            assert!(storage.insert_record(&line(2)).is_err(), "{kind}");
            assert_eq!(storage.read_records::<OrderLine>().unwrap().len(), 2, "{kind}");
        }
    }

    #[test]
    fn test_bad_stored_row_fails_typed_read() {
        let env = TestEnvironment::new().unwrap();
        let storage = Storage::new(&env.config(DatabaseKind::Text));
        storage
            .session(|backend| {
                backend.insert_one(
                    Table::Inventory,
                    &[
                        Value::from("x"),
                        "Acme".into(),
                        "Widget".into(),
                        "W".into(),
                        "1.00".into(),
                        "1".into(),
                    ],
                )
            })
            .unwrap();

        let err = storage.read_records::<Item>().unwrap_err();
        assert!(matches!(
            err,
            StorageError::Record(RecordError::TypeMismatch { column: "ItemID", .. })
        ));
    }

    #[test]
    fn test_session_returns_work_error_and_releases_handle() {
        let env = TestEnvironment::new().unwrap();
        let storage = Storage::new(&env.config(DatabaseKind::Local));

        let result: StorageResult<()> = storage.session(|backend| {
            backend.insert_one(Table::Customers, &customer(1, "Ann").attributes())?;
            backend.insert_one(Table::Customers, &[Value::Integer(2)])
        });
        assert!(matches!(result, Err(StorageError::Record(RecordError::FieldCount { .. }))));

        // The first insert was not rolled back and the file is usable again
        assert_eq!(storage.read_records::<Customer>().unwrap(), vec![customer(1, "Ann")]);
    }

    #[test]
    fn test_unreachable_remote_fails_to_open() {
        let env = TestEnvironment::new().unwrap();
        let mut config = env.config(DatabaseKind::Remote);
        config.remote.host = "127.0.0.1".to_string();
        config.remote.port = 1;
        config.remote.connect_timeout_secs = 2;

        let storage = Storage::new(&config);
        let err = storage.read_records::<Customer>().unwrap_err();
        assert!(err.is_connection());
    }
}
