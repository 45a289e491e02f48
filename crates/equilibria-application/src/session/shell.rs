//! Navigation shell: applies gate decisions to the route renderer.

use equilibria_core::SessionError;
use equilibria_core::session::{Route, RouteDecision, RouteRenderer, SessionGate, View};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::store::{SessionSnapshot, SessionStore, Subscription};

/// Locked after the store's subscriber slot and before its current snapshot.
struct ShellState {
    location: Route,
    view: View,
}

fn lock(state: &Mutex<ShellState>) -> MutexGuard<'_, ShellState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unmounted application shell.
pub struct AppShell {
    store: SessionStore,
    gate: SessionGate,
    renderer: Arc<dyn RouteRenderer>,
}

impl AppShell {
    pub fn new(store: SessionStore, gate: SessionGate, renderer: Arc<dyn RouteRenderer>) -> Self {
        Self {
            store,
            gate,
            renderer,
        }
    }

    /// Subscribes to the session store and renders `initial`.
    ///
    /// # Errors
    ///
    /// Fails if another shell is already mounted on the same store.
    pub fn mount(self, initial: Route) -> Result<MountedShell, SessionError> {
        let state = Arc::new(Mutex::new(ShellState {
            location: initial,
            view: View::Loading,
        }));

        let callback = {
            let state = state.clone();
            let gate = self.gate.clone();
            let renderer = self.renderer.clone();
            move |snapshot: &SessionSnapshot| {
                let mut state = lock(&state);
                let requested = state.location.clone();
                let view = resolve(&gate, snapshot, &mut state, requested);
                renderer.render(&view);
            }
        };

        let subscription = self.store.subscribe(callback)?;
        tracing::debug!("app shell mounted");

        Ok(MountedShell {
            store: self.store,
            gate: self.gate,
            renderer: self.renderer,
            state,
            subscription,
        })
    }
}

/// A mounted shell. Dropping it (or calling `unmount`) revokes its
/// subscription so no render happens after teardown.
pub struct MountedShell {
    store: SessionStore,
    gate: SessionGate,
    renderer: Arc<dyn RouteRenderer>,
    state: Arc<Mutex<ShellState>>,
    subscription: Subscription,
}

impl MountedShell {
    /// Handles a navigation event and renders the outcome.
    ///
    /// The snapshot is read under the shell lock, so a transition either
    /// lands before it or re-resolves the location right after.
    pub fn navigate(&self, route: Route) -> View {
        let mut state = lock(&self.state);
        let snapshot = self.store.snapshot();
        let view = resolve(&self.gate, &snapshot, &mut state, route);
        self.renderer.render(&view);
        view
    }

    pub fn current_view(&self) -> View {
        lock(&self.state).view.clone()
    }

    pub fn location(&self) -> Route {
        lock(&self.state).location.clone()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn unmount(self) {
        self.subscription.unsubscribe();
        tracing::debug!("app shell unmounted");
    }
}

/// Resolves `requested` and records the resulting location and view.
///
/// While pending, the requested route is kept as the location so it is
/// evaluated again once the session resolves.
fn resolve(
    gate: &SessionGate,
    snapshot: &SessionSnapshot,
    state: &mut ShellState,
    requested: Route,
) -> View {
    let view = match gate.decide(snapshot.state, &requested) {
        RouteDecision::Pending => {
            state.location = requested;
            View::Loading
        }
        RouteDecision::Render(route) => {
            state.location = route.clone();
            View::Page {
                route,
                session: snapshot.session.clone(),
                redirected_from: None,
            }
        }
        RouteDecision::Redirect(target) => {
            tracing::debug!(from = %requested, to = %target, "gate redirect");
            state.location = target.clone();
            View::Page {
                route: target,
                session: snapshot.session.clone(),
                redirected_from: Some(requested),
            }
        }
    };
    state.view = view.clone();
    view
}
