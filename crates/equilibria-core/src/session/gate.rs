//! Routing decision for protected pages.

use super::model::GateState;
use super::route::Route;
use serde::{Deserialize, Serialize};

/// Outcome of asking the gate about a requested route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDecision {
    /// Authentication is not resolved yet; show a neutral loading state.
    Pending,
    Render(Route),
    Redirect(Route),
}

impl RouteDecision {
    pub fn is_pending(&self) -> bool {
        matches!(self, RouteDecision::Pending)
    }
}

/// Decides which branch of the route tree may be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGate {
    sign_in: Route,
    landing: Route,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self {
            sign_in: Route::sign_in(),
            landing: Route::landing(),
        }
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default landing route for signed-in principals.
    pub fn with_landing(mut self, landing: Route) -> Self {
        if landing.is_protected() {
            self.landing = landing;
        }
        self
    }

    pub fn sign_in_route(&self) -> &Route {
        &self.sign_in
    }

    pub fn landing_route(&self) -> &Route {
        &self.landing
    }

    /// Resolves `requested` against the current authentication state.
    ///
    /// `Unknown` never commits to either branch: rendering the signed-out
    /// tree before the first notification causes a redirect flash.
    pub fn decide(&self, state: GateState, requested: &Route) -> RouteDecision {
        match state {
            GateState::Unknown => RouteDecision::Pending,
            GateState::SignedOut => {
                if requested.is_protected() {
                    RouteDecision::Redirect(self.sign_in.clone())
                } else {
                    RouteDecision::Render(requested.clone())
                }
            }
            GateState::SignedIn => {
                if requested.is_sign_in() {
                    RouteDecision::Redirect(self.landing.clone())
                } else {
                    RouteDecision::Render(requested.clone())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_routes() -> Vec<Route> {
        let mut routes = Route::NAVIGATION.to_vec();
        routes.push(Route::SignIn);
        routes.push(Route::Unmatched("/nowhere".into()));
        routes
    }

    #[test]
    fn test_unknown_is_always_pending() {
        let gate = SessionGate::new();
        for route in all_routes() {
            assert_eq!(gate.decide(GateState::Unknown, &route), RouteDecision::Pending);
        }
    }

    #[test]
    fn test_signed_out_redirects_protected_routes() {
        let gate = SessionGate::new();
        for route in all_routes() {
            let decision = gate.decide(GateState::SignedOut, &route);
            if route.is_sign_in() {
                assert_eq!(decision, RouteDecision::Render(Route::SignIn));
            } else {
                assert_eq!(decision, RouteDecision::Redirect(Route::SignIn));
            }
        }
    }

    #[test]
    fn test_signed_in_renders_and_leaves_sign_in() {
        let gate = SessionGate::new();
        assert_eq!(
            gate.decide(GateState::SignedIn, &Route::SignIn),
            RouteDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(
            gate.decide(GateState::SignedIn, &Route::Expenses),
            RouteDecision::Render(Route::Expenses)
        );
    }

    #[test]
    fn test_landing_cannot_be_the_sign_in_route() {
        let gate = SessionGate::new().with_landing(Route::SignIn);
        assert_eq!(gate.landing_route(), &Route::Dashboard);

        let gate = SessionGate::new().with_landing(Route::Write);
        assert_eq!(
            gate.decide(GateState::SignedIn, &Route::SignIn),
            RouteDecision::Redirect(Route::Write)
        );
    }
}
