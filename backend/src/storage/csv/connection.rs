use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use shared::Table;
use tracing::info;

/// CsvConnection maps each logical table to `<Table>.csv` inside one data directory
#[derive(Debug, Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

/// What `ensure_table_file` found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFile {
    Existing,
    Created,
}

impl CsvConnection {
    /// Create a new CSV connection, creating the data directory if it doesn't exist
    pub fn new<P: AsRef<Path>>(base_directory: P) -> io::Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created text data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn table_file_path(&self, table: Table) -> PathBuf {
        self.base_directory.join(format!("{}.csv", table.name()))
    }

    /// Make sure the table's file exists without touching existing content.
    ///
    /// Only a missing file leads to creation; any other failure to open it
    /// (permissions, a directory in the way) is returned to the caller.
    pub fn ensure_table_file(&self, table: Table) -> io::Result<TableFile> {
        let path = self.table_file_path(table);

        match File::open(&path) {
            Ok(_) => Ok(TableFile::Existing),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                match OpenOptions::new().write(true).create_new(true).open(&path) {
                    Ok(_) => Ok(TableFile::Created),
                    // Someone else created it between the two calls
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(TableFile::Existing),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Open a table file for reading
    pub fn open_for_read(&self, table: Table) -> io::Result<File> {
        File::open(self.table_file_path(table))
    }

    /// Open a table file emptied for a full rewrite
    pub fn open_truncated(&self, table: Table) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.table_file_path(table))
    }

    /// Open a table file positioned at its end
    pub fn open_for_append(&self, table: Table) -> io::Result<File> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.table_file_path(table))
    }
}
