//! Unified path management for equilibria configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/equilibria/        # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! └── logs/                    # Application logs
//!     └── equilibria.log.YYYY-MM-DD
//! ```

use std::path::{Path, PathBuf};

const APP_DIR: &str = "equilibria";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves where equilibria keeps its files.
///
/// A base path replaces the platform config directory; tests use it to
/// point at a temporary directory.
#[derive(Debug, Clone, Default)]
pub struct EquilibriaPaths {
    base: Option<PathBuf>,
}

impl EquilibriaPaths {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            base: base_path.map(Path::to_path_buf),
        }
    }

    /// Returns the configuration directory (e.g. `~/.config/equilibria/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600).
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    pub fn log_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_overrides_config_dir() {
        let base = tempfile::tempdir().unwrap();
        let paths = EquilibriaPaths::new(Some(base.path()));

        assert_eq!(paths.config_dir().unwrap(), base.path());
        assert_eq!(paths.config_file().unwrap(), base.path().join("config.toml"));
        assert_eq!(paths.secret_file().unwrap(), base.path().join("secret.json"));
        assert_eq!(paths.log_dir().unwrap(), base.path().join("logs"));
    }
}
