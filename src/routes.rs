//! Console views and the navigation guard.
//!
//! Protected views require an active session; without one the guard sends the
//! user to `/login`. The session-expiry hook of the API client lands here too.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Every view of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Logout,
    Dashboard,
    Users,
    Roles,
    Properties,
    CommonAreas,
    FeesAndFines,
    AccountStatement,
    Bulletins,
    PublishBulletin,
    Reservations,
    Cases,
    AiDetection,
}

impl Route {
    pub const ALL: [Route; 15] = [
        Route::Login,
        Route::Register,
        Route::Logout,
        Route::Dashboard,
        Route::Users,
        Route::Roles,
        Route::Properties,
        Route::CommonAreas,
        Route::FeesAndFines,
        Route::AccountStatement,
        Route::Bulletins,
        Route::PublishBulletin,
        Route::Reservations,
        Route::Cases,
        Route::AiDetection,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Logout => "/logout",
            Route::Dashboard => "/dashboard",
            Route::Users => "/usuarios",
            Route::Roles => "/roles",
            Route::Properties => "/propiedades",
            Route::CommonAreas => "/areas-comunes",
            Route::FeesAndFines => "/cuotas-multas",
            Route::AccountStatement => "/estado-cuenta",
            Route::Bulletins => "/comunicados",
            Route::PublishBulletin => "/comunicados/publicar",
            Route::Reservations => "/reservas",
            Route::Cases => "/casos",
            Route::AiDetection => "/ai-detection",
        }
    }

    /// Resolve a path. Unknown paths fall back to the dashboard.
    pub fn from_path(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        Route::ALL
            .into_iter()
            .find(|route| route.path() == trimmed)
            .unwrap_or(Route::Dashboard)
    }

    /// Whether the view needs a logged-in user.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Route::Login | Route::Register | Route::Logout)
    }
}

/// Tracks the current view and applies the auth guard on every move.
#[derive(Debug)]
pub struct Navigator {
    current: Mutex<Route>,
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn current(&self) -> Route {
        *self.lock()
    }

    /// Move to `route`, or to the login view if it is protected and there is
    /// no session. Returns where the user actually ended up.
    pub fn navigate(&self, route: Route, authenticated: bool) -> Route {
        let target = if route.requires_auth() && !authenticated {
            log::debug!("{} requires a session; redirecting to login", route.path());
            Route::Login
        } else {
            route
        };
        *self.lock() = target;
        target
    }

    /// Session-expiry target. Does nothing when already on the login view.
    pub fn redirect_to_login(&self) -> bool {
        let mut current = self.lock();
        if *current == Route::Login {
            return false;
        }
        log::info!("Session expired on {}; redirecting to /login", current.path());
        *current = Route::Login;
        true
    }

    fn lock(&self) -> MutexGuard<'_, Route> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Dashboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_back_to_routes() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), route);
        }
        assert_eq!(Route::from_path("/usuarios/"), Route::Users);
        assert_eq!(Route::from_path("/reservas?fecha=2025-03-14"), Route::Reservations);
    }

    #[test]
    fn unknown_paths_fall_back_to_dashboard() {
        assert_eq!(Route::from_path("/no-existe"), Route::Dashboard);
        assert_eq!(Route::from_path(""), Route::Dashboard);
    }

    #[test]
    fn public_views() {
        assert!(!Route::Login.requires_auth());
        assert!(!Route::Register.requires_auth());
        assert!(Route::Dashboard.requires_auth());
        assert!(Route::AiDetection.requires_auth());
    }

    #[test]
    fn guard_redirects_without_session() {
        let nav = Navigator::default();
        assert_eq!(nav.navigate(Route::Users, false), Route::Login);
        assert_eq!(nav.current(), Route::Login);

        assert_eq!(nav.navigate(Route::Register, false), Route::Register);
        assert_eq!(nav.navigate(Route::Users, true), Route::Users);
    }

    #[test]
    fn redirect_to_login_is_idempotent() {
        let nav = Navigator::new(Route::Reservations);
        assert!(nav.redirect_to_login());
        assert!(!nav.redirect_to_login());
        assert_eq!(nav.current(), Route::Login);
    }
}
