//! Identity provider contract.
//!
//! The hosted identity service is consumed, not reimplemented. Adapters
//! implement [`IdentityProvider`] and publish session changes on a watch
//! channel so late subscribers still observe the latest state.

use super::model::{AuthNotification, Session};
use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tokio::sync::watch;

/// Federated identity providers offered on the sign-in page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
    Facebook,
    Github,
}

impl FederatedProvider {
    /// Provider id understood by the identity toolkit.
    pub fn provider_id(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "google.com",
            FederatedProvider::Facebook => "facebook.com",
            FederatedProvider::Github => "github.com",
        }
    }

    /// The kind of token this provider's handshake hands back.
    pub fn token_kind(&self) -> TokenKind {
        match self {
            FederatedProvider::Google => TokenKind::IdToken,
            FederatedProvider::Facebook | FederatedProvider::Github => TokenKind::AccessToken,
        }
    }

    /// Whether the toolkit accepts `kind` for this provider.
    pub fn accepts(&self, kind: TokenKind) -> bool {
        match self {
            FederatedProvider::Google => true,
            FederatedProvider::Facebook | FederatedProvider::Github => {
                kind == TokenKind::AccessToken
            }
        }
    }
}

/// OAuth token kinds a provider handshake can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenKind {
    #[strum(serialize = "id_token")]
    IdToken,
    #[strum(serialize = "access_token")]
    AccessToken,
}

/// Token obtained from a provider handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub kind: TokenKind,
    pub token: String,
}

impl ProviderCredential {
    pub fn new(kind: TokenKind, token: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("kind", &self.kind)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Receiver side of the provider's session-change channel.
///
/// `None` means the provider has not reported a session yet.
pub type NotificationReceiver = watch::Receiver<Option<AuthNotification>>;

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticates with email and password.
    async fn sign_in_with_credential(&self, email: &str, secret: &str)
    -> Result<Session, AuthError>;

    /// Creates an account and signs it in.
    async fn register_with_credential(
        &self,
        email: &str,
        secret: &str,
        display_name: Option<&str>,
    ) -> Result<Session, AuthError>;

    /// Runs the provider handshake and exchanges its token for a session.
    async fn sign_in_with_federated_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<Session, AuthError>;

    /// Terminates the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribes to session changes.
    fn notifications(&self) -> NotificationReceiver;
}

/// Performs the interactive part of a federated sign-in.
#[async_trait::async_trait]
pub trait FederatedTokenSource: Send + Sync {
    /// Returns the provider-issued token, or `None` if the user cancelled.
    async fn obtain_credential(
        &self,
        provider: FederatedProvider,
    ) -> Result<Option<ProviderCredential>, AuthError>;
}
