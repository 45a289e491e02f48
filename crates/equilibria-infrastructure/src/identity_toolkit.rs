//! RestIdentityProvider - identity toolkit REST adapter.
//!
//! Authenticates against the hosted identity toolkit (`accounts:*` endpoints)
//! and keeps the id/refresh token pair in memory. Every session change is
//! published on a watch channel, which is what the session store listens to.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use equilibria_core::AuthError;
use equilibria_core::config::IdentitySettings;
use equilibria_core::session::{
    AuthNotification, FederatedProvider, FederatedTokenSource, IdentityProvider,
    NotificationReceiver, Principal, ProviderCredential, Session,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Wait before retrying a refresh that failed on the network.
const REFRESH_RETRY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
struct TokenState {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    fn refresh_at(&self) -> DateTime<Utc> {
        self.expires_at - ChronoDuration::seconds(REFRESH_MARGIN_SECS)
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.refresh_at() <= now
    }

    fn refresh_due_in(&self, now: DateTime<Utc>) -> Duration {
        (self.refresh_at() - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Identity provider backed by the identity toolkit REST API.
pub struct RestIdentityProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    token_endpoint: String,
    request_uri: String,
    federated: Option<Arc<dyn FederatedTokenSource>>,
    tokens: Mutex<Option<TokenState>>,
    sender: watch::Sender<Option<AuthNotification>>,
}

impl RestIdentityProvider {
    /// Creates a provider for the given API key.
    ///
    /// Nothing is published until the first sign-in or
    /// [`resolve_initial_session`](Self::resolve_initial_session).
    pub fn new(api_key: impl Into<String>, settings: &IdentitySettings) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| AuthError::Unavailable(format!("Failed to build HTTP client: {e}")))?;
        let (sender, _) = watch::channel(None);

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token_endpoint: settings.token_endpoint.trim_end_matches('/').to_string(),
            request_uri: settings.request_uri.clone(),
            federated: None,
            tokens: Mutex::new(None),
            sender,
        })
    }

    /// Installs the handler that performs the interactive provider handshake.
    pub fn with_federated_source(mut self, source: Arc<dyn FederatedTokenSource>) -> Self {
        self.federated = Some(source);
        self
    }

    /// Reports the startup session.
    ///
    /// Tokens are held in memory only, so a fresh process has nothing to
    /// restore and reports `SignedOut`. If tokens are present they are
    /// refreshed first.
    pub async fn resolve_initial_session(&self) -> Result<(), AuthError> {
        if self.current_tokens().is_none() {
            tracing::debug!("[Identity] no stored session; reporting signed out");
            self.publish(AuthNotification::SignedOut);
            return Ok(());
        }
        self.refresh_session().await
    }

    /// Refreshes the id token when it is about to expire.
    ///
    /// A refresh token the service rejects ends the session: `SignedOut` is
    /// published and `SessionExpired` returned. Network failures leave the
    /// session untouched.
    pub async fn refresh_session(&self) -> Result<(), AuthError> {
        let Some(tokens) = self.current_tokens() else {
            return Ok(());
        };
        if !tokens.needs_refresh(Utc::now()) {
            return Ok(());
        }

        let url = format!("{}/token?key={}", self.token_endpoint, self.api_key);
        let request = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: &tokens.refresh_token,
        };
        match self.post::<_, RefreshResponse>(&url, &request).await {
            Ok(refreshed) => {
                let expires_at = expiry_from(&refreshed.expires_in);
                self.store_tokens(TokenState {
                    id_token: refreshed.id_token,
                    refresh_token: refreshed.refresh_token,
                    expires_at,
                });
                tracing::debug!(%expires_at, "[Identity] id token refreshed");
                Ok(())
            }
            Err(AuthError::SessionExpired) => {
                tracing::info!("[Identity] refresh token rejected; session expired");
                self.clear_tokens();
                self.publish(AuthNotification::SignedOut);
                Err(AuthError::SessionExpired)
            }
            Err(err) => Err(err),
        }
    }

    /// Keeps the session fresh for as long as the future is polled.
    ///
    /// Sleeps until the id token enters its refresh margin, then refreshes.
    /// A rejected refresh publishes `SignedOut` through
    /// [`refresh_session`](Self::refresh_session); network failures are
    /// retried. Every session change re-arms the timer.
    pub async fn keep_session_fresh(&self) {
        let mut changes = self.sender.subscribe();
        loop {
            let due = self
                .current_tokens()
                .map(|tokens| tokens.refresh_due_in(Utc::now()));

            let Some(wait) = due else {
                if changes.changed().await.is_err() {
                    return;
                }
                continue;
            };

            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(wait) => match self.refresh_session().await {
                    Ok(()) | Err(AuthError::SessionExpired) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "[Identity] scheduled refresh failed; retrying");
                        tokio::time::sleep(REFRESH_RETRY).await;
                    }
                },
            }
        }
    }

    /// Returns the current id token, if signed in.
    pub fn id_token(&self) -> Option<String> {
        self.current_tokens().map(|tokens| tokens.id_token)
    }

    fn url(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.endpoint, method, self.api_key)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_error_body(status.as_u16(), &body_text));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| {
                AuthError::Unavailable(format!("Malformed identity response: {}", e.without_url()))
            })
    }

    /// Records the tokens, publishes the sign-in and returns the session.
    fn complete_sign_in(&self, response: AuthResponse) -> Session {
        let expires_at = expiry_from(&response.expires_in);
        self.store_tokens(TokenState {
            id_token: response.id_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at,
        });

        let principal = response.into_principal();
        tracing::info!(principal_id = %principal.id, "[Identity] signed in");
        let session = Session::signed_in(&principal);
        self.publish(AuthNotification::signed_in(principal));
        session
    }

    fn publish(&self, notification: AuthNotification) {
        self.sender.send_replace(Some(notification));
    }

    fn current_tokens(&self) -> Option<TokenState> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_tokens(&self, tokens: TokenState) {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    fn clear_tokens(&self) {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[async_trait::async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in_with_credential(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Session, AuthError> {
        let request = PasswordRequest {
            email,
            password: secret,
            return_secure_token: true,
        };
        let response: AuthResponse = self
            .post(&self.url("signInWithPassword"), &request)
            .await?;
        Ok(self.complete_sign_in(response))
    }

    async fn register_with_credential(
        &self,
        email: &str,
        secret: &str,
        display_name: Option<&str>,
    ) -> Result<Session, AuthError> {
        let request = PasswordRequest {
            email,
            password: secret,
            return_secure_token: true,
        };
        let mut response: AuthResponse = self.post(&self.url("signUp"), &request).await?;

        if let Some(name) = display_name.map(str::trim).filter(|name| !name.is_empty()) {
            let update = ProfileUpdateRequest {
                id_token: &response.id_token,
                display_name: name,
                return_secure_token: false,
            };
            let updated: ProfileUpdateResponse = self.post(&self.url("update"), &update).await?;
            response.display_name = updated.display_name.or_else(|| Some(name.to_string()));
        }

        Ok(self.complete_sign_in(response))
    }

    async fn sign_in_with_federated_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<Session, AuthError> {
        let source = self.federated.as_ref().ok_or_else(|| {
            AuthError::Unavailable(format!("No sign-in handler configured for {provider}"))
        })?;

        let Some(credential) = source.obtain_credential(provider).await? else {
            tracing::debug!(%provider, "[Identity] federated sign-in cancelled");
            return Err(AuthError::ProviderCancelled);
        };
        if !provider.accepts(credential.kind) {
            return Err(AuthError::invalid_input(format!(
                "{provider} sign-in needs an {}, not an {}",
                provider.token_kind(),
                credential.kind
            )));
        }

        let post_body = idp_post_body(provider, &credential);
        let request = IdpRequest {
            post_body: &post_body,
            request_uri: &self.request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: AuthResponse = self.post(&self.url("signInWithIdp"), &request).await?;
        Ok(self.complete_sign_in(response))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // The toolkit has no revoke endpoint for client tokens; dropping them ends the session.
        self.clear_tokens();
        self.publish(AuthNotification::SignedOut);
        tracing::info!("[Identity] signed out");
        Ok(())
    }

    fn notifications(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }
}

/// Form-encoded credential passed to `signInWithIdp`.
fn idp_post_body(provider: FederatedProvider, credential: &ProviderCredential) -> String {
    format!(
        "{}={}&providerId={}",
        credential.kind,
        urlencoding::encode(&credential.token),
        urlencoding::encode(provider.provider_id())
    )
}

fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.trim().parse::<i64>().unwrap_or(0);
    Utc::now() + ChronoDuration::seconds(seconds)
}

/// Request URLs carry the API key, so it is stripped before formatting.
fn map_transport_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::network("identity request timed out")
    } else {
        AuthError::network(format!("identity request failed: {}", err.without_url()))
    }
}

/// Maps an error body such as `{"error":{"code":400,"message":"EMAIL_EXISTS"}}`.
///
/// Messages may carry a detail after ` : `, e.g.
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn map_error_body(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|wrapper| wrapper.error.message)
        .unwrap_or_else(|| body.trim().to_string());
    let (code, detail) = match message.split_once(" : ") {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (message.trim(), None),
    };

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::InvalidCredential
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" | "MISSING_PASSWORD" => {
            AuthError::invalid_input(detail.unwrap_or(code).to_string())
        }
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(
            detail
                .unwrap_or("Password should be at least 6 characters")
                .to_string(),
        ),
        "USER_DISABLED" => AuthError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" | "INVALID_ID_TOKEN" => {
            AuthError::SessionExpired
        }
        "INVALID_IDP_RESPONSE" | "FEDERATED_USER_ID_ALREADY_LINKED" => {
            AuthError::ProviderError(message.clone())
        }
        _ if status >= 500 => AuthError::Unavailable(format!("{status}: {message}")),
        _ => AuthError::ProviderError(format!("{status}: {message}")),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

impl AuthResponse {
    fn into_principal(self) -> Principal {
        Principal {
            id: self.local_id,
            email: self.email.filter(|email| !email.is_empty()),
            display_name: self.display_name.filter(|name| !name.is_empty()),
            avatar_url: self.photo_url.filter(|url| !url.is_empty()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateResponse {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
