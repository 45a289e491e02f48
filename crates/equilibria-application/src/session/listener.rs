use equilibria_core::session::NotificationReceiver;

use super::store::SessionStore;

/// Feeds identity provider notifications into a [`SessionStore`].
///
/// Run it on the event loop with [`SessionListener::run`], or step it with
/// [`SessionListener::pump`].
pub struct SessionListener {
    store: SessionStore,
    receiver: NotificationReceiver,
    primed: bool,
}

impl SessionListener {
    pub(crate) fn new(store: SessionStore, receiver: NotificationReceiver) -> Self {
        Self {
            store,
            receiver,
            primed: false,
        }
    }

    /// Applies the next notification, waiting for one if needed.
    ///
    /// The first call applies whatever the provider already reported before
    /// the listener existed. Returns `false` once the provider has gone away.
    pub async fn pump(&mut self) -> bool {
        if !self.primed {
            self.primed = true;
            let current = self.receiver.borrow_and_update().clone();
            if let Some(notification) = current {
                self.store.apply_notification(&notification);
                return true;
            }
        }

        if self.receiver.changed().await.is_err() {
            return false;
        }
        let current = self.receiver.borrow_and_update().clone();
        if let Some(notification) = current {
            self.store.apply_notification(&notification);
        }
        true
    }

    /// Pumps until the provider's channel closes.
    pub async fn run(mut self) {
        while self.pump().await {}
        tracing::info!("identity notification channel closed");
    }
}

#[cfg(test)]
mod tests {
    use crate::session::SessionStore;
    use crate::test_support::{FakeIdentityProvider, Recorder, principal};
    use equilibria_core::config::SignInPolicy;
    use equilibria_core::session::{AuthNotification, GateState};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pump_applies_notifications_in_order() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = SessionStore::new(fake.clone(), SignInPolicy::default());
        let recorder = Recorder::default();
        let _subscription = store.subscribe(recorder.callback()).unwrap();
        let mut listener = store.listener();

        fake.emit(AuthNotification::SignedOut);
        assert!(listener.pump().await);
        assert_eq!(store.snapshot().state, GateState::SignedOut);

        fake.emit(AuthNotification::signed_in(principal("P1")));
        assert!(listener.pump().await);
        assert_eq!(store.snapshot().state, GateState::SignedIn);

        let states: Vec<_> = recorder.snapshots().iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![GateState::Unknown, GateState::SignedOut, GateState::SignedIn]
        );
    }

    #[tokio::test]
    async fn test_first_pump_sees_state_reported_before_listener() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = SessionStore::new(fake.clone(), SignInPolicy::default());
        fake.emit(AuthNotification::signed_in(principal("early")));

        let mut listener = store.listener();
        assert!(listener.pump().await);

        assert_eq!(
            store.snapshot().session.principal_id.as_deref(),
            Some("early")
        );
    }

    #[tokio::test]
    async fn test_repeated_notification_renders_once() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = SessionStore::new(fake.clone(), SignInPolicy::default());
        let recorder = Recorder::default();
        let _subscription = store.subscribe(recorder.callback()).unwrap();
        let mut listener = store.listener();

        fake.emit(AuthNotification::signed_in(principal("P")));
        listener.pump().await;
        fake.emit(AuthNotification::signed_in(principal("P")));
        listener.pump().await;

        assert_eq!(recorder.snapshots().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_provider_dropped() {
        let fake = Arc::new(FakeIdentityProvider::new());
        let store = SessionStore::new(fake, SignInPolicy::default());
        let (sender, receiver) = tokio::sync::watch::channel(None);
        let listener = super::SessionListener::new(store, receiver);
        drop(sender);

        tokio::time::timeout(std::time::Duration::from_secs(1), listener.run())
            .await
            .expect("listener should stop once the sender is gone");
    }
}
