//! Credential form validation, applied before any identity call.

use crate::error::AuthError;
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Email/password pair entered on the sign-in or registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialForm {
    pub email: String,
    pub password: String,
}

impl CredentialForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// Checks the form for a sign-in attempt.
    pub fn validate_sign_in(&self) -> Result<(), AuthError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(AuthError::invalid_input(
                "Please enter both email and password",
            ));
        }
        Ok(())
    }

    /// Checks the form for account creation.
    pub fn validate_registration(&self) -> Result<(), AuthError> {
        self.validate_sign_in()?;
        if !EMAIL_SHAPE.is_match(&self.email) {
            return Err(AuthError::invalid_input("Please enter a valid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::invalid_input(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}
