//! Session domain model.
//!
//! A `Session` is the client-local record of whether a principal is signed in
//! and who they are. It holds display attributes only; tokens stay inside the
//! identity adapter.

use serde::{Deserialize, Serialize};

/// Avatar shown when the principal has none.
pub const DEFAULT_AVATAR_URL: &str = "https://ui-avatars.com/api/?name=User";

/// The authenticated identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Provider-assigned user id
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            avatar_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Client-local session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub principal_id: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Session {
    /// The session every process starts with.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(principal: &Principal) -> Self {
        Self {
            authenticated: true,
            principal_id: Some(principal.id.clone()),
            display_name: principal
                .display_name
                .clone()
                .or_else(|| principal.email.clone()),
            avatar_url: principal.avatar_url.clone(),
        }
    }

    /// Avatar to display, falling back to a generated placeholder.
    pub fn avatar_or_default(&self) -> &str {
        self.avatar_url.as_deref().unwrap_or(DEFAULT_AVATAR_URL)
    }
}

/// A session change pushed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthNotification {
    SignedIn { principal: Principal },
    /// No principal: sign-out, expiry, or nothing to restore at startup.
    SignedOut,
}

impl AuthNotification {
    pub fn signed_in(principal: Principal) -> Self {
        Self::SignedIn { principal }
    }

    pub fn to_session(&self) -> Session {
        match self {
            Self::SignedIn { principal } => Session::signed_in(principal),
            Self::SignedOut => Session::signed_out(),
        }
    }

    pub fn gate_state(&self) -> GateState {
        match self {
            Self::SignedIn { .. } => GateState::SignedIn,
            Self::SignedOut => GateState::SignedOut,
        }
    }
}

/// Authentication state as seen by the routing gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GateState {
    /// Before the identity provider has reported anything.
    #[default]
    Unknown,
    SignedOut,
    SignedIn,
}
