//! Application state for the console.
//!
//! Holds the shared session, both HTTP clients and the navigator. The backend
//! client reports session expiry to the navigator, which moves to `/login`.

use std::sync::Arc;

use crate::api::ai::AiService;
use crate::api::client::ApiClient;
use crate::api::types::UserProfile;
use crate::config::Config;
use crate::routes::{Navigator, Route};
use crate::session::Session;

/// Everything a command needs, built once at start-up.
#[derive(Debug)]
pub struct AppState {
    /// Credential shared by both clients.
    pub session: Arc<Session>,

    /// Condominium backend client (`<base>/api`).
    pub api: ApiClient,

    /// AI detection microservice client.
    pub ai: AiService,

    pub navigator: Arc<Navigator>,
}

impl AppState {
    /// Restore the persisted session and wire the clients to it.
    pub fn new(config: &Config) -> Self {
        let session = Arc::new(Session::restore(config.credential_store()));
        let navigator = Arc::new(Navigator::default());

        let api = {
            let navigator = navigator.clone();
            ApiClient::new(&config.api_prefix(), session.clone())
                .with_timeout(config.timeout)
                .with_retry_policy(config.retry_policy())
                .on_session_expired(move || {
                    navigator.redirect_to_login();
                })
        };
        let ai = AiService::new(&config.ai_service_base, session.clone());

        Self {
            session,
            api,
            ai,
            navigator,
        }
    }

    /// Enter `route` through the auth guard.
    ///
    /// Returns the logged-in user, or `None` when the guard redirected to login.
    pub async fn enter(&self, route: Route) -> Option<UserProfile> {
        let user = self.session.user().await;
        let landed = self.navigator.navigate(route, user.is_some());
        if landed != route {
            return None;
        }
        user.or_else(|| (!route.requires_auth()).then(UserProfile::default))
    }
}
