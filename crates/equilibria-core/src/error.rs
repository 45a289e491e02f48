//! Error types for the Equilibria client.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures raised by the identity provider or by credential validation.
///
/// These are surfaced to the form that triggered them and never flip the
/// session to signed-in.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// Unknown account or wrong password
    #[error("Invalid email or password")]
    InvalidCredential,

    /// Input rejected before any call was made
    #[error("{0}")]
    InvalidInput(String),

    /// Registration attempted for an email that already has an account
    #[error("An account already exists for this email")]
    EmailExists,

    /// Password rejected by the provider
    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    /// The account was disabled by an administrator
    #[error("This account has been disabled")]
    UserDisabled,

    /// Provider-side throttling
    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    /// The user backed out of a federated handshake
    #[error("Sign-in with the provider was cancelled")]
    ProviderCancelled,

    /// Federated provider failure
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Session token could no longer be refreshed
    #[error("Session expired")]
    SessionExpired,

    /// Transport failure during an identity operation
    #[error("Network error: {0}")]
    Network(String),

    /// The identity service answered with something unexpected
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Check if this error was caused by user input (as opposed to the service)
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredential
                | Self::InvalidInput(_)
                | Self::EmailExists
                | Self::WeakPassword(_)
                | Self::ProviderCancelled
        )
    }
}

/// Failures of the generative-text endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection-level failure
    #[error("Generative API request failed: {0}")]
    Network(String),

    /// No answer within the configured request timeout
    #[error("Generative API request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("Generative API returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retryable: bool,
        retry_after: Option<Duration>,
    },

    /// Quota or rate limit exhausted
    #[error("Generative API quota exceeded: {0}")]
    Quota(String),

    /// Body could not be parsed
    #[error("Malformed generative API response: {0}")]
    MalformedResponse(String),

    /// Successful call that carried no text
    #[error("Generative API returned no text")]
    EmptyResponse,

    /// No API key was configured
    #[error("Generative API key is not configured")]
    MissingApiKey,
}

impl ApiError {
    /// Whether a caller could reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::Quota(_) => true,
            Self::Http { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// Misuse of the session store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The store already has a live subscriber
    #[error("The session store already has an active subscription")]
    AlreadySubscribed,
}

/// A shared error type for the whole client.
///
/// Domain-specific errors convert into it through `From`, so bootstrap code can
/// use `?` across layers.
#[derive(Error, Debug, Clone)]
pub enum EquilibriaError {
    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EquilibriaError {
    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this error indicates a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { message } => message.to_lowercase().contains("not found"),
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for EquilibriaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for EquilibriaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EquilibriaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for EquilibriaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (bootstrap edge only)
impl From<anyhow::Error> for EquilibriaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, EquilibriaError>`.
pub type Result<T> = std::result::Result<T, EquilibriaError>;
