//! Navigation table of the app.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A navigable location.
///
/// Every route except `SignIn` requires a signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Dashboard,
    Expenses,
    Academic,
    Write,
    Entries,
    Goals,
    Settings,
    Help,
    SignIn,
    /// A path with no page behind it.
    Unmatched(String),
}

impl Route {
    /// Pages listed in the navigation sidebar, in display order.
    pub const NAVIGATION: [Route; 8] = [
        Route::Dashboard,
        Route::Expenses,
        Route::Academic,
        Route::Write,
        Route::Entries,
        Route::Goals,
        Route::Settings,
        Route::Help,
    ];

    /// Where a signed-in principal lands by default.
    pub fn landing() -> Self {
        Route::Dashboard
    }

    /// The sign-in entry point.
    pub fn sign_in() -> Self {
        Route::SignIn
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Dashboard => "/",
            Route::Expenses => "/expenses",
            Route::Academic => "/academic",
            Route::Write => "/write",
            Route::Entries => "/entries",
            Route::Goals => "/goals",
            Route::Settings => "/settings",
            Route::Help => "/help",
            Route::SignIn => "/auth",
            Route::Unmatched(path) => path,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Expenses => "Expenses",
            Route::Academic => "Academic",
            Route::Write => "Write",
            Route::Entries => "Entries",
            Route::Goals => "Goals",
            Route::Settings => "Settings",
            Route::Help => "Help & Support",
            Route::SignIn => "Sign in",
            Route::Unmatched(_) => "Not found",
        }
    }

    /// Parses a location path. Trailing slashes and a missing leading slash
    /// are tolerated; anything unknown becomes `Unmatched`.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim().trim_end_matches('/');
        let normalized = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };

        match normalized.as_str() {
            "/" | "/dashboard" => Route::Dashboard,
            "/expenses" => Route::Expenses,
            "/academic" => Route::Academic,
            "/write" => Route::Write,
            "/entries" => Route::Entries,
            "/goals" => Route::Goals,
            "/settings" => Route::Settings,
            "/help" => Route::Help,
            "/auth" => Route::SignIn,
            _ => Route::Unmatched(normalized),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::SignIn)
    }

    pub fn is_sign_in(&self) -> bool {
        matches!(self, Route::SignIn)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_paths_parse() {
        for route in Route::NAVIGATION {
            assert_eq!(Route::from_path(route.path()), route);
        }
        assert_eq!(Route::from_path("/auth"), Route::SignIn);
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(Route::from_path(""), Route::Dashboard);
        assert_eq!(Route::from_path("goals/"), Route::Goals);
        assert_eq!(
            Route::from_path("/category/work"),
            Route::Unmatched("/category/work".to_string())
        );
    }

    #[test]
    fn test_only_sign_in_is_public() {
        assert!(!Route::SignIn.is_protected());
        assert!(Route::Unmatched("/x".into()).is_protected());
        assert!(Route::NAVIGATION.iter().all(Route::is_protected));
    }
}
