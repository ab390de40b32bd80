//! Route gating on the resolved session.
//!
//! [`classify`] is a pure function of the route class and the session state.
//! It never navigates; callers act on the returned decision. While the
//! session is still resolving every route waits, so a page load never
//! flashes a redirect before the session fetch completes.

use crate::config::NavigationConfig;
use crate::session::SessionState;

/// Access class of a navigable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Public,
    Authenticated,
    AdminOnly,
}

impl RouteClass {
    /// Classify a storefront path.
    ///
    /// `/checkout`, `/profile` and `/orders` need a session; product
    /// creation and editing need an admin. Everything else is public. A
    /// query string or trailing slash does not change the class.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["checkout" | "profile" | "orders", ..] => Self::Authenticated,
            ["products", "new"] | ["products", _, "edit"] => Self::AdminOnly,
            _ => Self::Public,
        }
    }
}

/// Where a refused navigation is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    /// No session: go log in.
    Login,
    /// A session without the needed role: go home.
    Home,
}

impl RedirectTarget {
    /// The configured path for this target.
    #[must_use]
    pub fn path(self, navigation: &NavigationConfig) -> &str {
        match self {
            Self::Login => &navigation.login_path,
            Self::Home => &navigation.home_path,
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The session is still resolving; show a neutral indicator.
    Wait,
    /// Render the view.
    Allow,
    /// Navigate elsewhere.
    Redirect(RedirectTarget),
}

/// Decide what to do with a navigation to `route`.
#[must_use]
pub const fn classify(route: RouteClass, state: &SessionState) -> GateDecision {
    let SessionState::Resolved(user) = state else {
        return GateDecision::Wait;
    };

    match (route, user) {
        (RouteClass::Public, _) => GateDecision::Allow,
        (RouteClass::Authenticated, Some(_)) => GateDecision::Allow,
        (RouteClass::Authenticated, None) => GateDecision::Redirect(RedirectTarget::Login),
        (RouteClass::AdminOnly, Some(user)) if user.is_admin => GateDecision::Allow,
        (RouteClass::AdminOnly, _) => GateDecision::Redirect(RedirectTarget::Home),
    }
}

/// A gated view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated<V> {
    Waiting,
    Render(V),
    Redirect(RedirectTarget),
}

impl<V> Gated<V> {
    /// The rendered view, if the gate allowed it.
    pub fn into_view(self) -> Option<V> {
        match self {
            Self::Render(view) => Some(view),
            Self::Waiting | Self::Redirect(_) => None,
        }
    }
}

/// Wrap a view behind the gate. `view` runs only when access is allowed.
pub fn guard<V, F>(route: RouteClass, state: &SessionState, view: F) -> Gated<V>
where
    F: FnOnce() -> V,
{
    match classify(route, state) {
        GateDecision::Wait => Gated::Waiting,
        GateDecision::Allow => Gated::Render(view()),
        GateDecision::Redirect(target) => Gated::Redirect(target),
    }
}

#[cfg(test)]
mod tests {
    use shopease_core::{SessionUser, UserId};

    use super::*;

    fn resolved(is_admin: Option<bool>) -> SessionState {
        SessionState::Resolved(is_admin.map(|is_admin| SessionUser {
            id: UserId::new(1),
            username: "alice".to_string(),
            is_admin,
        }))
    }

    #[test]
    fn test_resolving_waits_for_every_route() {
        for route in [RouteClass::Public, RouteClass::Authenticated, RouteClass::AdminOnly] {
            assert_eq!(classify(route, &SessionState::Resolving), GateDecision::Wait);
        }
    }

    #[test]
    fn test_public_always_allows() {
        for state in [resolved(None), resolved(Some(false)), resolved(Some(true))] {
            assert_eq!(classify(RouteClass::Public, &state), GateDecision::Allow);
        }
    }

    #[test]
    fn test_authenticated_routes() {
        assert_eq!(
            classify(RouteClass::Authenticated, &resolved(None)),
            GateDecision::Redirect(RedirectTarget::Login)
        );
        assert_eq!(
            classify(RouteClass::Authenticated, &resolved(Some(false))),
            GateDecision::Allow
        );
    }

    #[test]
    fn test_admin_routes_send_non_admins_home() {
        assert_eq!(
            classify(RouteClass::AdminOnly, &resolved(None)),
            GateDecision::Redirect(RedirectTarget::Home)
        );
        assert_eq!(
            classify(RouteClass::AdminOnly, &resolved(Some(false))),
            GateDecision::Redirect(RedirectTarget::Home)
        );
        assert_eq!(
            classify(RouteClass::AdminOnly, &resolved(Some(true))),
            GateDecision::Allow
        );
    }

    #[test]
    fn test_guard_only_builds_allowed_views() {
        let mut built = 0;
        let gated = guard(RouteClass::Authenticated, &SessionState::Resolving, || {
            built += 1;
        });
        assert_eq!(gated, Gated::Waiting);

        let gated = guard(RouteClass::AdminOnly, &resolved(Some(false)), || {
            built += 1;
        });
        assert_eq!(gated, Gated::Redirect(RedirectTarget::Home));
        assert_eq!(built, 0);

        let gated = guard(RouteClass::AdminOnly, &resolved(Some(true)), || "edit form");
        assert_eq!(gated.into_view(), Some("edit form"));
    }

    #[test]
    fn test_for_path() {
        assert_eq!(RouteClass::for_path("/"), RouteClass::Public);
        assert_eq!(RouteClass::for_path("/products"), RouteClass::Public);
        assert_eq!(RouteClass::for_path("/products/12"), RouteClass::Public);
        assert_eq!(RouteClass::for_path("/cart"), RouteClass::Public);
        assert_eq!(RouteClass::for_path("/checkout"), RouteClass::Authenticated);
        assert_eq!(RouteClass::for_path("/orders/"), RouteClass::Authenticated);
        assert_eq!(RouteClass::for_path("/profile?tab=1"), RouteClass::Authenticated);
        assert_eq!(RouteClass::for_path("/products/new"), RouteClass::AdminOnly);
        assert_eq!(RouteClass::for_path("/products/12/edit"), RouteClass::AdminOnly);
    }

    #[test]
    fn test_redirect_paths_come_from_config() {
        let navigation = NavigationConfig {
            login_path: "/auth/login".to_string(),
            home_path: "/".to_string(),
        };
        assert_eq!(RedirectTarget::Login.path(&navigation), "/auth/login");
        assert_eq!(RedirectTarget::Home.path(&navigation), "/");
    }
}
