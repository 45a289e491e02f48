//! Secret service implementation.
//!
//! Reads API keys from `secret.json` and lets the environment override them.

use crate::paths::EquilibriaPaths;
use equilibria_core::config::{GeminiConfig, IdentityKeyConfig, SecretConfig};
use equilibria_core::secret::SecretService;
use equilibria_core::{EquilibriaError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const IDENTITY_API_KEY_ENV: &str = "EQUILIBRIA_IDENTITY_API_KEY";

/// Keys taken from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub gemini_api_key: Option<String>,
    pub identity_api_key: Option<String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        Self {
            gemini_api_key: non_empty_var(GEMINI_API_KEY_ENV),
            identity_api_key: non_empty_var(IDENTITY_API_KEY_ENV),
        }
    }

    fn apply(&self, mut secrets: SecretConfig) -> SecretConfig {
        if let Some(key) = &self.gemini_api_key {
            match secrets.gemini.as_mut() {
                Some(gemini) => gemini.api_key = key.clone(),
                None => {
                    secrets.gemini = Some(GeminiConfig {
                        api_key: key.clone(),
                        model_name: None,
                    })
                }
            }
        }
        if let Some(key) = &self.identity_api_key {
            secrets.identity = Some(IdentityKeyConfig {
                api_key: key.clone(),
            });
        }
        secrets
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Service for loading secret configuration.
///
/// The file is read once and cached. A missing file is not an error; the
/// environment alone may supply every key.
#[derive(Clone)]
pub struct SecretServiceImpl {
    path: PathBuf,
    overrides: EnvOverrides,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretServiceImpl {
    pub fn new(path: impl Into<PathBuf>, overrides: EnvOverrides) -> Self {
        Self {
            path: path.into(),
            overrides,
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses `secret.json` in the resolved configuration directory and the
    /// current process environment.
    pub fn from_paths(paths: &EquilibriaPaths) -> Result<Self> {
        let path = paths
            .secret_file()
            .map_err(|e| EquilibriaError::config(format!("Failed to get secret path: {}", e)))?;
        Ok(Self::new(path, EnvOverrides::from_process_env()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_secrets_internal(&self) -> Result<SecretConfig> {
        {
            let read_lock = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let from_file = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            serde_json::from_str::<SecretConfig>(&content).map_err(|e| {
                // Never echo file content; it holds keys.
                EquilibriaError::config(format!(
                    "Failed to parse secret file at {}: line {}",
                    self.path.display(),
                    e.line()
                ))
            })?
        } else {
            SecretConfig::default()
        };
        let loaded = self.overrides.apply(from_file);

        let mut write_lock = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> Result<SecretConfig> {
        self.load_secrets_internal()
    }

    async fn secret_file_exists(&self) -> bool {
        self.path.exists()
    }
}
