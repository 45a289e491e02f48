use super::model::Session;
use super::route::Route;

/// What the route tree should currently display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Authentication not resolved yet.
    Loading,
    Page {
        route: Route,
        session: Session,
        /// Set when the gate moved the user away from the requested route.
        redirected_from: Option<Route>,
    },
}

impl View {
    pub fn route(&self) -> Option<&Route> {
        match self {
            View::Loading => None,
            View::Page { route, .. } => Some(route),
        }
    }
}

/// The UI layer that draws whatever the navigation shell decides.
pub trait RouteRenderer: Send + Sync {
    fn render(&self, view: &View);
}
