use stockroom_backend::config::{AppConfig, DatabaseKind};
use stockroom_backend::storage::Storage;
use tempfile::TempDir;

/// Storage for one variant inside a scratch directory removed on drop
pub struct TestStore {
    pub storage: Storage,
    pub config: AppConfig,
    pub temp_dir: TempDir,
}

impl TestStore {
    pub fn new(kind: DatabaseKind) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.database.kind = Some(kind.to_string());
        config.local.path = temp_dir.path().join("stockroom.db");
        config.text.directory = temp_dir.path().join("text");
        Self {
            storage: Storage::new(&config),
            config,
            temp_dir,
        }
    }
}

/// The variants that run without a server
pub const LOCAL_KINDS: [DatabaseKind; 2] = [DatabaseKind::Local, DatabaseKind::Text];
