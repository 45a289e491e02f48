//! Domain types and collaborator contracts for the Equilibria client.
//!
//! Nothing in this crate performs IO; adapters live in
//! `equilibria-infrastructure` and `equilibria-interaction`, orchestration in
//! `equilibria-application`.

pub mod chat;
pub mod config;
pub mod error;
pub mod secret;
pub mod session;

// Re-export common error types
pub use error::{ApiError, AuthError, EquilibriaError, Result, SessionError};
