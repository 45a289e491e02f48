//! Session orchestration: the store, its notification listener and the
//! navigation shell that renders gate decisions.

mod listener;
mod shell;
mod store;

pub use listener::SessionListener;
pub use shell::{AppShell, MountedShell};
pub use store::{SessionSnapshot, SessionStore, Subscription};
