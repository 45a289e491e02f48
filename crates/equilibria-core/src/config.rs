//! Configuration models.
//!
//! `RootConfig` mirrors `config.toml`, `SecretConfig` mirrors `secret.json`.
//! Loading lives in the infrastructure crate.

use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How a successful sign-in call affects the local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInPolicy {
    /// Only the identity provider's change notification flips the session.
    #[default]
    NotificationDriven,
    /// The session returned by the call is applied immediately.
    Optimistic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub sign_in_policy: SignInPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySettings {
    #[serde(default = "default_identity_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Redirect URI sent with federated credentials
    #[serde(default = "default_request_uri")]
    pub request_uri: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            endpoint: default_identity_endpoint(),
            token_endpoint: default_token_endpoint(),
            request_uri: default_request_uri(),
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// espeak-compatible program used for text-to-speech
    #[serde(default = "default_speech_program")]
    pub program: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            program: default_speech_program(),
        }
    }
}

/// Debug settings for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Root of `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub debug: DebugSettings,
}

/// Gemini API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Identity toolkit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityKeyConfig {
    pub api_key: String,
}

/// Root of `secret.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiConfig>,
    #[serde(default)]
    pub identity: Option<IdentityKeyConfig>,
}

fn default_identity_endpoint() -> String {
    DEFAULT_IDENTITY_ENDPOINT.to_string()
}

fn default_token_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_string()
}

fn default_request_uri() -> String {
    "http://localhost".to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_gemini_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_speech_program() -> String {
    "espeak".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
