//! Terminal stand-ins for the UI collaborators.

use colored::Colorize;
use equilibria_core::AuthError;
use equilibria_core::session::{
    FederatedProvider, FederatedTokenSource, ProviderCredential, Route, RouteRenderer, View,
};

/// Prints each view the shell decides on.
pub struct TerminalRenderer;

impl RouteRenderer for TerminalRenderer {
    fn render(&self, view: &View) {
        match view {
            View::Loading => println!("{}", "Loading...".bright_black()),
            View::Page {
                route,
                session,
                redirected_from,
            } => {
                if let Some(from) = redirected_from {
                    println!("{}", format!("Redirected from {from}").yellow());
                }
                println!(
                    "{}",
                    format!("[{}] {}", route.label(), route.path())
                        .bright_magenta()
                        .bold()
                );
                if session.authenticated {
                    let name = session
                        .display_name
                        .as_deref()
                        .or(session.principal_id.as_deref())
                        .unwrap_or("User");
                    println!(
                        "{}",
                        format!("{name} ({})", session.avatar_or_default()).bright_black()
                    );
                } else if route.is_sign_in() {
                    println!(
                        "{}",
                        "Sign in with /login, /register or /federated.".bright_black()
                    );
                }
                if matches!(route, Route::Unmatched(_)) {
                    println!("{}", "Page not found.".red());
                }
            }
        }
    }
}

/// Stands in for the provider's popup: the user pastes the token the
/// provider issued, or an empty line to cancel.
pub struct PromptedTokenSource;

#[async_trait::async_trait]
impl FederatedTokenSource for PromptedTokenSource {
    async fn obtain_credential(
        &self,
        provider: FederatedProvider,
    ) -> Result<Option<ProviderCredential>, AuthError> {
        let kind = provider.token_kind();
        println!(
            "{}",
            format!("Paste the {provider} {kind} (empty line cancels):").bright_yellow()
        );
        let line = tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            std::io::stdin().read_line(&mut buffer).map(|_| buffer)
        })
        .await
        .map_err(|e| AuthError::ProviderError(e.to_string()))?
        .map_err(|e| AuthError::ProviderError(e.to_string()))?;

        let token = line.trim();
        Ok((!token.is_empty()).then(|| ProviderCredential::new(kind, token)))
    }
}
