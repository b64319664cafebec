//! Role-based route authorization.
//!
//! [`authorize`] is a pure decision function: it never navigates, never
//! mutates, and returns the same decision for the same inputs. The caller
//! performs the redirect. Guarded views run the check on mount and again on
//! every session change, so an externally reassigned role re-routes tabs
//! that are already open instead of leaving them in a stale authorized
//! state.

use eventdesk_types::{Role, SessionSnapshot};

/// The routes the guard can send a session to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    ClientHome,
    AgencyHome,
    AdminHome,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::ClientHome => "/home",
            Self::AgencyHome => "/agency-dashboard",
            Self::AdminHome => "/admin-dashboard",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Redirect(Route),
}

/// The home route for each role. Total over the closed enum: an
/// unrepresentable role cannot reach this function, and the exhaustive
/// match makes adding a role a compile error until routed.
pub fn home_route_for(role: Role) -> Route {
    match role {
        Role::Client => Route::ClientHome,
        Role::Agency => Route::AgencyHome,
        Role::Admin => Route::AdminHome,
    }
}

/// Decides whether a session may see a view requiring `required`.
///
/// Unauthenticated sessions go to the login route; sessions holding a
/// different role go to their own home route.
pub fn authorize(session: &SessionSnapshot, required: Role) -> AccessDecision {
    match session {
        SessionSnapshot::Unauthenticated => AccessDecision::Redirect(Route::Login),
        SessionSnapshot::Authenticated(profile) if profile.role == required => {
            AccessDecision::Allow
        }
        SessionSnapshot::Authenticated(profile) => {
            AccessDecision::Redirect(home_route_for(profile.role))
        }
    }
}
