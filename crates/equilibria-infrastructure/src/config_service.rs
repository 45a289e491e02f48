//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml`, falling back to defaults
//! when the file does not exist.

use crate::paths::EquilibriaPaths;
use equilibria_core::config::RootConfig;
use equilibria_core::{EquilibriaError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses `config.toml` in the resolved configuration directory.
    pub fn from_paths(paths: &EquilibriaPaths) -> Result<Self> {
        let path = paths
            .config_file()
            .map_err(|e| EquilibriaError::config(e.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Writes a default `config.toml` if none exists yet.
    pub fn ensure_config_file(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&RootConfig::default())?;
        std::fs::write(&self.path, content)?;
        tracing::info!(path = %self.path.display(), "wrote default configuration");
        Ok(())
    }

    fn load_config(&self) -> Result<RootConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file; using defaults");
            return Ok(RootConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: RootConfig = toml::from_str(&content).map_err(|e| {
            EquilibriaError::config(format!(
                "Failed to parse configuration file at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equilibria_core::config::SignInPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));

        assert_eq!(service.get_config().unwrap(), RootConfig::default());
    }

    #[test]
    fn test_loads_and_caches_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\nsign_in_policy = \"optimistic\"\n").unwrap();
        let service = ConfigService::new(&path);

        assert_eq!(
            service.get_config().unwrap().auth.sign_in_policy,
            SignInPolicy::Optimistic
        );

        // Cached until invalidated
        std::fs::write(&path, "").unwrap();
        assert_eq!(
            service.get_config().unwrap().auth.sign_in_policy,
            SignInPolicy::Optimistic
        );
        service.invalidate_cache();
        assert_eq!(
            service.get_config().unwrap().auth.sign_in_policy,
            SignInPolicy::NotificationDriven
        );
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[auth\n").unwrap();

        let err = ConfigService::new(&path).get_config().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_ensure_config_file_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let service = ConfigService::new(&path);

        service.ensure_config_file().unwrap();

        assert!(path.exists());
        assert_eq!(service.get_config().unwrap(), RootConfig::default());
    }
}
