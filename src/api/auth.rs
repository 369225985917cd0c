//! Authentication endpoints: login, registration, current user and logout.
//!
//! Login stores the returned token and user snapshot in the shared session so
//! every later request carries it.

use reqwest::Method;
use serde_json::Value;

use super::client::{ApiClient, RequestOptions};
use super::error::ApiError;
use super::types::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserProfile};
use crate::session::Credential;

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const CURRENT_USER_PATH: &str = "/auth/user/";
const LOGOUT_PATH: &str = "/auth/logout/";

/// Exchange email and password for a token and activate the session.
///
/// The request is sent without any previous token attached.
pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<UserProfile, ApiError> {
    let body = LoginRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    };
    let options = RequestOptions::new(Method::POST).json(&body)?.anonymous();
    let response: LoginResponse = api.request(LOGIN_PATH, options).await?.json()?;

    if response.token.is_empty() {
        return Err(ApiError::Decode("login response carried an empty token".into()));
    }

    let user = response.user.clone();
    api.session()
        .establish(Credential::new(response.token, response.user))
        .await?;

    log::info!("Logged in as {} (codigo {})", user.correo, user.codigo);
    Ok(user)
}

/// Create a new account. Returns the backend's confirmation message, if any.
pub async fn register(api: &ApiClient, request: &RegisterRequest) -> Result<Option<String>, ApiError> {
    let options = RequestOptions::new(Method::POST).json(request)?.anonymous();
    let response: RegisterResponse = api.request(REGISTER_PATH, options).await?.json()?;
    log::info!("Registered {}", request.correo);
    Ok(response.message)
}

/// Fetch the profile behind the current token.
pub async fn current_user(api: &ApiClient) -> Result<UserProfile, ApiError> {
    api.get(CURRENT_USER_PATH).await
}

/// Invalidate the token server-side, then forget it locally.
///
/// The server call is best-effort: the local session is cleared even when it
/// fails. A rejected token has already been cleared by the client.
pub async fn logout(api: &ApiClient) -> Result<(), ApiError> {
    if api.session().is_active().await {
        let options = RequestOptions::new(Method::POST).retries(0);
        match api.request(LOGOUT_PATH, options).await {
            Ok(_) => {}
            Err(e) if e.is_session_expired() => {
                log::info!("Logged out (token already rejected)");
                return Ok(());
            }
            Err(e) => log::warn!("Server-side logout failed: {}", e),
        }
    }

    api.session().clear().await?;
    log::info!("Logged out");
    Ok(())
}

/// Whether the backend still accepts the stored token.
///
/// A rejected token expires the session as a side effect of the request.
pub async fn validate_session(api: &ApiClient) -> Result<bool, ApiError> {
    if !api.session().is_active().await {
        return Ok(false);
    }
    match api.get::<Value>(CURRENT_USER_PATH).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_session_expired() => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::api::retry::{Backoff, RetryPolicy};
    use crate::api::types::Sex;
    use crate::session::{CredentialStore, MemoryStore, Session};

    fn client(server: &mockito::ServerGuard, store: Arc<MemoryStore>) -> ApiClient {
        let session = Arc::new(Session::restore(Box::new(store)));
        ApiClient::new(&format!("{}/api", server.url()), session)
            .with_retry_policy(RetryPolicy::new(2).with_backoff(Backoff::exponential(Duration::from_millis(1))))
    }

    #[tokio::test]
    async fn login_establishes_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/login/")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"email": "admin@condo.bo", "password": "clave"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "token": "9944b091",
                    "user": {
                        "codigo": 1,
                        "nombre": "Luis",
                        "apellido": "Vaca",
                        "correo": "admin@condo.bo",
                        "rol": {"id": 1, "descripcion": "Administrador"}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::default());
        let api = client(&server, store.clone());
        let user = login(&api, " admin@condo.bo ", "clave").await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.full_name(), "Luis Vaca");
        assert_eq!(user.role_name(), Some("Administrador"));
        assert_eq!(api.session().token().await.as_deref(), Some("9944b091"));
        assert_eq!(store.load().unwrap().unwrap().token(), "9944b091");
    }

    #[tokio::test]
    async fn bad_credentials_leave_session_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/login/")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"non_field_errors": ["x"], "message": "Credenciales incorrectas"}"#)
            .create_async()
            .await;

        let api = client(&server, Arc::new(MemoryStore::default()));
        let err = login(&api, "a@b.c", "mala").await.unwrap_err();

        assert_eq!(err.to_string(), "Credenciales incorrectas");
        assert!(!api.session().is_active().await);
    }

    #[tokio::test]
    async fn register_returns_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/register/")
            .match_body(Matcher::PartialJson(json!({"correo": "eva@condo.bo", "sexo": "F"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Usuario registrado"}"#)
            .create_async()
            .await;

        let api = client(&server, Arc::new(MemoryStore::default()));
        let request = RegisterRequest {
            nombre: "Eva".into(),
            apellido: "Suarez".into(),
            correo: "eva@condo.bo".into(),
            contrasena: "secreta".into(),
            sexo: Sex::Female,
            telefono: Some("70000000".into()),
        };
        let message = register(&api, &request).await.unwrap();
        assert_eq!(message.as_deref(), Some("Usuario registrado"));
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/logout/")
            .match_header("authorization", "Token t")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_credential(Credential::new("t", UserProfile::default())));
        let api = client(&server, store.clone());
        logout(&api).await.unwrap();

        mock.assert_async().await;
        assert!(!api.session().is_active().await);
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn logout_with_rejected_token_clears_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/logout/")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_credential(Credential::new("t", UserProfile::default())));
        let api = client(&server, store.clone());
        logout(&api).await.unwrap();

        mock.assert_async().await;
        assert!(!api.session().is_active().await);
        assert_eq!(store.clear_count(), 1);
    }

    #[tokio::test]
    async fn validate_session_reports_rejected_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/user/")
            .with_status(401)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::with_credential(Credential::new("old", UserProfile::default())));
        let api = client(&server, store.clone());

        assert!(!validate_session(&api).await.unwrap());
        assert_eq!(store.clear_count(), 1);
    }
}
