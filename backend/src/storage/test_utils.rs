//! Scratch directories and configurations for storage tests.
//!
//! The temporary directory is removed when the environment is dropped, even if
//! the test panics.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{AppConfig, DatabaseKind};

pub struct TestEnvironment {
    pub base_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        Ok(Self {
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Configuration pointing the chosen variant at this environment
    pub fn config(&self, kind: DatabaseKind) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.kind = Some(kind.to_string());
        config.local.path = self.base_path.join("stockroom.db");
        config.text.directory = self.base_path.join("text");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_cleanup() -> Result<()> {
        let base_path;
        {
            let env = TestEnvironment::new()?;
            base_path = env.base_path.clone();
            assert!(base_path.exists());
        }
        assert!(!base_path.exists());
        Ok(())
    }
}
