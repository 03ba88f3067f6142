//! # Settings File
//!
//! Which storage variant to use and where it lives, read once at start-up from
//! a YAML file and handed to [`Storage`](crate::storage::Storage) explicitly.
//!
//! ## YAML Format
//!
//! ```yaml
//! database:
//!   type: Local        # Local | Remote | Text
//! local:
//!   path: data/stockroom.db
//! remote:
//!   host: localhost
//!   port: 3306
//!   username: stockroom
//!   password: secret
//!   database: impact
//!   connect_timeout_secs: 5
//! text:
//!   directory: data/text
//! ```
//!
//! Every key is optional. A missing file yields the defaults; the file is never
//! written back.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::storage::BackendKind;

pub const DEFAULT_CONFIG_FILE: &str = "settings.yaml";
pub const CONFIG_PATH_ENV: &str = "STOCKROOM_CONFIG";

/// Storage variant named by `database.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Local,
    Remote,
    Text,
}

impl DatabaseKind {
    /// Map a configured name to a variant; anything unrecognised is `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "local" => Some(DatabaseKind::Local),
            "remote" => Some(DatabaseKind::Remote),
            "text" => Some(DatabaseKind::Text),
            _ => None,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        match self {
            DatabaseKind::Local => BackendKind::EmbeddedSql,
            DatabaseKind::Remote => BackendKind::NetworkedSql,
            DatabaseKind::Text => BackendKind::DelimitedText,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatabaseKind::Local => "Local",
            DatabaseKind::Remote => "Remote",
            DatabaseKind::Text => "Text",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Embedded SQL file location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    pub path: PathBuf,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("stockroom.db"),
        }
    }
}

/// Networked SQL server credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub connect_timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: "impact".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Directory holding the delimited-text table files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub directory: PathBuf,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data").join("text"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub local: LocalSettings,
    pub remote: RemoteSettings,
    pub text: TextSettings,
}

impl AppConfig {
    /// Load settings from `path`; a missing or empty file gives the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&yaml_content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(yaml_content)?;
        debug!("Loaded settings: database.type = {:?}", config.database.kind);
        Ok(config)
    }

    /// Configured storage variant; missing or unrecognised means `Local`
    pub fn database_kind(&self) -> DatabaseKind {
        match self.database.kind.as_deref() {
            None => DatabaseKind::Local,
            Some(name) => DatabaseKind::parse(name).unwrap_or_else(|| {
                warn!("Unknown database type '{}', falling back to Local", name);
                DatabaseKind::Local
            }),
        }
    }
}

/// Settings path: first command-line argument, then `STOCKROOM_CONFIG`, then `settings.yaml`
pub fn resolve_config_path(argument: Option<String>, environment: Option<String>) -> PathBuf {
    argument
        .or(environment)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(temp_dir.path().join("settings.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database_kind(), DatabaseKind::Local);
        assert!(!temp_dir.path().join("settings.yaml").exists());
    }

    #[test]
    fn test_full_file_is_read() {
        let yaml = r#"
database:
  type: Remote
remote:
  host: db.example.com
  port: 3307
  username: shop
  password: hunter2
  database: impact
text:
  directory: /srv/stockroom
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.database_kind(), DatabaseKind::Remote);
        assert_eq!(config.remote.host, "db.example.com");
        assert_eq!(config.remote.port, 3307);
        assert_eq!(config.remote.connect_timeout_secs, 5);
        assert_eq!(config.text.directory, PathBuf::from("/srv/stockroom"));
        assert_eq!(config.local, LocalSettings::default());
    }

    #[test]
    fn test_unknown_type_selects_local() {
        let config = AppConfig::from_yaml("database:\n  type: Cloud\n").unwrap();
        assert_eq!(config.database_kind(), DatabaseKind::Local);

        let config = AppConfig::from_yaml("database: {}\n").unwrap();
        assert_eq!(config.database_kind(), DatabaseKind::Local);

        let config = AppConfig::from_yaml("database:\n  type: text\n").unwrap();
        assert_eq!(config.database_kind(), DatabaseKind::Text);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(&path, "database: [unclosed\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_config_path_precedence() {
        assert_eq!(
            resolve_config_path(Some("a.yaml".into()), Some("b.yaml".into())),
            PathBuf::from("a.yaml")
        );
        assert_eq!(resolve_config_path(None, Some("b.yaml".into())), PathBuf::from("b.yaml"));
        assert_eq!(resolve_config_path(None, None), PathBuf::from(DEFAULT_CONFIG_FILE));
    }
}
