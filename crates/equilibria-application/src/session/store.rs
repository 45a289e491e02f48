//! Process-wide session store.
//!
//! The store is the single source of truth for "is someone signed in, and
//! who". It is written only by its [`SessionListener`](super::SessionListener)
//! (provider notifications) and by an acknowledged [`SessionStore::sign_out`].

use equilibria_core::config::SignInPolicy;
use equilibria_core::session::{
    AuthNotification, CredentialForm, FederatedProvider, GateState, IdentityProvider, Session,
};
use equilibria_core::{AuthError, SessionError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::listener::SessionListener;

/// Value delivered to the subscriber on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: GateState,
    pub session: Session,
    /// Incremented on every applied transition.
    pub revision: u64,
}

type Callback = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

struct StoreInner {
    identity: Arc<dyn IdentityProvider>,
    policy: SignInPolicy,
    current: Mutex<SessionSnapshot>,
    /// Lock order: `subscriber` before `current`.
    subscriber: Mutex<Option<Subscriber>>,
    next_subscriber_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owned session state with a single revocable subscription.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Creates a store in the `Unknown` state.
    ///
    /// # Arguments
    ///
    /// * `identity` - The identity provider whose notifications drive the store
    /// * `policy` - Whether successful sign-in calls flip the session immediately
    pub fn new(identity: Arc<dyn IdentityProvider>, policy: SignInPolicy) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                identity,
                policy,
                current: Mutex::new(SessionSnapshot::default()),
                subscriber: Mutex::new(None),
                next_subscriber_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.inner.current).clone()
    }

    pub fn policy(&self) -> SignInPolicy {
        self.inner.policy
    }

    /// Creates the listener that feeds provider notifications into this store.
    pub fn listener(&self) -> SessionListener {
        SessionListener::new(self.clone(), self.inner.identity.notifications())
    }

    /// Registers `callback`, invoking it immediately with the current snapshot
    /// and again after every transition.
    ///
    /// Only one subscription may be live at a time. Callbacks must not call
    /// `subscribe` or revoke a subscription themselves.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubscribed` if another subscription is live.
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription, SessionError>
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        let mut slot = lock(&self.inner.subscriber);
        if slot.is_some() {
            return Err(SessionError::AlreadySubscribed);
        }

        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(callback);
        let snapshot = self.snapshot();
        callback(&snapshot);
        *slot = Some(Subscriber { id, callback });
        tracing::debug!(subscriber_id = id, "session store subscribed");

        Ok(Subscription {
            store: Arc::downgrade(&self.inner),
            id,
            active: true,
        })
    }

    pub fn has_subscriber(&self) -> bool {
        lock(&self.inner.subscriber).is_some()
    }

    /// Forwards a credential sign-in to the identity provider.
    ///
    /// Under `SignInPolicy::NotificationDriven` the returned session is only
    /// an acknowledgement; the provider's notification performs the flip.
    pub async fn sign_in_with_credential(
        &self,
        form: &CredentialForm,
    ) -> Result<Session, AuthError> {
        form.validate_sign_in()?;
        let session = self
            .inner
            .identity
            .sign_in_with_credential(&form.email, &form.password)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "credential sign-in failed"))?;
        self.accept_sign_in(&session);
        Ok(session)
    }

    /// Creates an account through the identity provider.
    pub async fn register_with_credential(
        &self,
        form: &CredentialForm,
        display_name: Option<&str>,
    ) -> Result<Session, AuthError> {
        form.validate_registration()?;
        let session = self
            .inner
            .identity
            .register_with_credential(&form.email, &form.password, display_name)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "registration failed"))?;
        self.accept_sign_in(&session);
        Ok(session)
    }

    pub async fn sign_in_with_federated_provider(
        &self,
        provider: FederatedProvider,
    ) -> Result<Session, AuthError> {
        let session = self
            .inner
            .identity
            .sign_in_with_federated_provider(provider)
            .await
            .inspect_err(|err| {
                tracing::warn!(provider = %provider, error = %err, "federated sign-in failed")
            })?;
        self.accept_sign_in(&session);
        Ok(session)
    }

    /// Asks the provider to end the session and resets locally on success.
    ///
    /// # Errors
    ///
    /// The provider's error is returned unchanged and the local session is
    /// left as it was.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        match self.inner.identity.sign_out().await {
            Ok(()) => {
                self.transition(GateState::SignedOut, Session::signed_out(), "sign_out");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "sign-out failed; keeping current session");
                Err(err)
            }
        }
    }

    /// Applies a provider notification. Returns whether anything changed.
    pub(crate) fn apply_notification(&self, notification: &AuthNotification) -> bool {
        self.transition(
            notification.gate_state(),
            notification.to_session(),
            "notification",
        )
    }

    fn accept_sign_in(&self, session: &Session) {
        match self.inner.policy {
            SignInPolicy::NotificationDriven => {
                tracing::debug!("sign-in accepted; waiting for provider notification");
            }
            SignInPolicy::Optimistic => {
                self.transition(GateState::SignedIn, session.clone(), "optimistic_sign_in");
            }
        }
    }

    fn transition(&self, state: GateState, session: Session, cause: &'static str) -> bool {
        let slot = lock(&self.inner.subscriber);

        let snapshot = {
            let mut current = lock(&self.inner.current);
            if current.state == state && current.session == session {
                tracing::trace!(cause, "session unchanged; skipping render");
                return false;
            }
            current.state = state;
            current.session = session;
            current.revision += 1;
            current.clone()
        };

        tracing::info!(
            cause,
            state = ?snapshot.state,
            principal = snapshot.session.principal_id.as_deref().unwrap_or("-"),
            revision = snapshot.revision,
            "session transition"
        );

        if let Some(subscriber) = slot.as_ref() {
            (subscriber.callback)(&snapshot);
        }
        true
    }

    fn revoke(inner: &StoreInner, id: u64) {
        let mut slot = lock(&inner.subscriber);
        if slot.as_ref().is_some_and(|subscriber| subscriber.id == id) {
            *slot = None;
            tracing::debug!(subscriber_id = id, "session store unsubscribed");
        }
    }
}

/// Handle for a live store subscription; revoked on `unsubscribe` or drop.
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.revoke();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn revoke(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.store.upgrade() {
            SessionStore::revoke(&inner, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeIdentityProvider, Recorder, principal};

    fn store_with(fake: &Arc<FakeIdentityProvider>, policy: SignInPolicy) -> SessionStore {
        SessionStore::new(fake.clone(), policy)
    }

    #[test]
    fn test_subscribe_fires_immediately_with_unknown() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());
        let recorder = Recorder::default();

        let _subscription = store.subscribe(recorder.callback()).unwrap();

        let seen = recorder.snapshots();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].state, GateState::Unknown);
        assert!(!seen[0].session.authenticated);
    }

    #[test]
    fn test_identical_notifications_render_once() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());
        let recorder = Recorder::default();
        let _subscription = store.subscribe(recorder.callback()).unwrap();

        let signed_in = AuthNotification::signed_in(principal("P"));
        assert!(store.apply_notification(&signed_in));
        assert!(!store.apply_notification(&signed_in));

        let seen = recorder.snapshots();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].state, GateState::SignedIn);
        assert_eq!(seen[1].session.principal_id.as_deref(), Some("P"));
        assert_eq!(store.snapshot().revision, 1);
    }

    #[test]
    fn test_second_subscription_is_rejected_until_revoked() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());
        let first = Recorder::default();
        let second = Recorder::default();

        let subscription = store.subscribe(first.callback()).unwrap();
        assert!(matches!(
            store.subscribe(second.callback()),
            Err(SessionError::AlreadySubscribed)
        ));

        subscription.unsubscribe();
        let _again = store.subscribe(second.callback()).unwrap();
        assert_eq!(second.snapshots().len(), 1);
    }

    #[test]
    fn test_revoked_callback_never_fires() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());
        let recorder = Recorder::default();

        let subscription = store.subscribe(recorder.callback()).unwrap();
        drop(subscription);
        assert!(!store.has_subscriber());

        store.apply_notification(&AuthNotification::SignedOut);
        assert_eq!(recorder.snapshots().len(), 1);
        assert_eq!(store.snapshot().state, GateState::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_session() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());
        store.apply_notification(&AuthNotification::signed_in(principal("P1")));

        fake.fail_sign_out(AuthError::network("offline"));
        let err = store.sign_out().await.unwrap_err();

        assert_eq!(err, AuthError::network("offline"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.state, GateState::SignedIn);
        assert!(snapshot.session.authenticated);
    }

    #[tokio::test]
    async fn test_sign_out_success_resets_session() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());
        let recorder = Recorder::default();
        let _subscription = store.subscribe(recorder.callback()).unwrap();
        store.apply_notification(&AuthNotification::signed_in(principal("P1")));

        store.sign_out().await.unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.state, GateState::SignedOut);
        assert_eq!(snapshot.session, Session::signed_out());
        assert_eq!(recorder.snapshots().len(), 3);
    }

    #[tokio::test]
    async fn test_notification_driven_sign_in_does_not_flip() {
        let fake = Arc::new(FakeIdentityProvider::new());
        fake.accept_credential("ada@example.com", "hunter22", principal("P1"));
        let store = store_with(&fake, SignInPolicy::NotificationDriven);
        store.apply_notification(&AuthNotification::SignedOut);

        let form = CredentialForm::new("ada@example.com", "hunter22");
        let session = store.sign_in_with_credential(&form).await.unwrap();

        assert!(session.authenticated);
        assert_eq!(store.snapshot().state, GateState::SignedOut);
    }

    #[tokio::test]
    async fn test_optimistic_sign_in_flips_immediately() {
        let fake = Arc::new(FakeIdentityProvider::new());
        fake.accept_credential("ada@example.com", "hunter22", principal("P1"));
        let store = store_with(&fake, SignInPolicy::Optimistic);
        store.apply_notification(&AuthNotification::SignedOut);

        let form = CredentialForm::new("ada@example.com", "hunter22");
        store.sign_in_with_credential(&form).await.unwrap();

        assert_eq!(store.snapshot().state, GateState::SignedIn);
        // The provider's own notification afterwards is a no-op.
        assert!(!store.apply_notification(&AuthNotification::signed_in(principal("P1"))));
    }

    #[tokio::test]
    async fn test_rejected_credential_never_flips() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::Optimistic);
        store.apply_notification(&AuthNotification::SignedOut);

        let form = CredentialForm::new("ada@example.com", "wrong");
        let err = store.sign_in_with_credential(&form).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredential);
        assert_eq!(store.snapshot().state, GateState::SignedOut);
    }

    #[tokio::test]
    async fn test_invalid_form_is_rejected_before_provider_call() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::default());

        let err = store
            .sign_in_with_credential(&CredentialForm::new("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidInput(_)));
        assert_eq!(fake.credential_calls(), 0);
    }

    #[tokio::test]
    async fn test_short_registration_password_is_rejected_locally() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::Optimistic);

        let err = store
            .register_with_credential(&CredentialForm::new("ada@example.com", "12345"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidInput(_)));
        assert_eq!(fake.credential_calls(), 0);
        assert_eq!(store.snapshot().state, GateState::Unknown);
    }

    #[tokio::test]
    async fn test_optimistic_registration_applies_display_name() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = store_with(&fake, SignInPolicy::Optimistic);

        let form = CredentialForm::new("ada@example.com", "hunter22");
        store
            .register_with_credential(&form, Some("Ada"))
            .await
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.state, GateState::SignedIn);
        assert_eq!(snapshot.session.display_name.as_deref(), Some("Ada"));
        assert_eq!(fake.credential_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_federated_sign_in_keeps_state() {
        let fake = Arc::new(FakeIdentityProvider::new());
        fake.federated_result(Err(AuthError::ProviderCancelled));
        let store = store_with(&fake, SignInPolicy::Optimistic);
        store.apply_notification(&AuthNotification::SignedOut);

        let err = store
            .sign_in_with_federated_provider(FederatedProvider::Google)
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::ProviderCancelled);
        assert_eq!(store.snapshot().state, GateState::SignedOut);
    }

    #[tokio::test]
    async fn test_federated_sign_in_waits_for_notification() {
        let fake = Arc::new(FakeIdentityProvider::new());
        fake.federated_result(Ok(principal("F1")));
        let store = store_with(&fake, SignInPolicy::NotificationDriven);
        store.apply_notification(&AuthNotification::SignedOut);

        let session = store
            .sign_in_with_federated_provider(FederatedProvider::Github)
            .await
            .unwrap();
        assert_eq!(session.principal_id.as_deref(), Some("F1"));
        assert_eq!(store.snapshot().state, GateState::SignedOut);

        store.apply_notification(&AuthNotification::signed_in(principal("F1")));
        assert_eq!(store.snapshot().session, session);
    }
}
