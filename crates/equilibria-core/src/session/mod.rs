//! Session gate domain.
//!
//! # Module Structure
//!
//! - `model`: Session, Principal, notifications and gate state
//! - `route`: navigation table
//! - `gate`: routing decision function
//! - `identity`: identity provider contract
//! - `credentials`: form validation
//! - `view`: route renderer contract

mod credentials;
mod gate;
mod identity;
mod model;
mod route;
mod view;

pub use credentials::{CredentialForm, MIN_PASSWORD_LEN};
pub use gate::{RouteDecision, SessionGate};
pub use identity::{
    FederatedProvider, FederatedTokenSource, IdentityProvider, NotificationReceiver,
    ProviderCredential, TokenKind,
};
pub use model::{AuthNotification, DEFAULT_AVATAR_URL, GateState, Principal, Session};
pub use route::Route;
pub use view::{RouteRenderer, View};
