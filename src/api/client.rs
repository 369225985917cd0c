//! HTTP client with token injection, error normalization and retry.
//!
//! Every backend call goes through [`ApiClient::request`]:
//! the session token is attached as `Authorization: Token <t>`, 401/403 expire
//! the session (unless disabled per client), 5xx and transport failures are retried under the client's
//! [`RetryPolicy`], and everything else becomes an [`ApiError`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::{extract_error_message, status_fallback, ApiError, BACKEND_ERROR_KEYS};
use super::response::ApiResponse;
use super::retry::{Failure, RetryPolicy};
use crate::session::Session;

/// Authorization scheme expected by the backend (DRF token authentication).
pub const AUTH_SCHEME: &str = "Token";

/// Default whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Called after a 401/403 cleared the session. Typically navigates to login.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Which credential, if any, a request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Use the session's token when one is active.
    #[default]
    Session,
    /// Use this token regardless of the session.
    Token(String),
    /// Send no `Authorization` header.
    Anonymous,
}

/// A file field in a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

/// Multipart form kept as plain data so a retry can rebuild it unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    fn to_form(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for file in &self.files {
            let part = Part::bytes(file.data.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)
                .map_err(|e| ApiError::InvalidRequest(format!("bad mime type {}: {}", file.mime, e)))?;
            form = form.part(file.field.clone(), part);
        }
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    None,
    Json(Value),
    Multipart(MultipartBody),
}

/// Per-request options. Defaults: GET, session auth, no body, client retry budget.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub auth: Auth,
    pub body: RequestBody,
    pub headers: HeaderMap,
    /// Overrides the client's retry budget for this request.
    pub retries: Option<u32>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("body is not serializable: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Token(token.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Result of a single attempt.
enum Attempt {
    Done(Result<ApiResponse, ApiError>),
    Retry(Failure),
}

/// HTTP client wrapper for backend communication.
///
/// Cheap to share behind an `Arc`; the session is shared with whoever handles
/// login and logout.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
    retry: RetryPolicy,
    error_keys: &'static [&'static str],
    expires_session: bool,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClient {
    /// Create a client for `base_url` (for example `http://127.0.0.1:8000/api`).
    pub fn new(base_url: &str, session: Arc<Session>) -> Self {
        Self {
            client: build_http_client(DEFAULT_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            retry: RetryPolicy::default(),
            error_keys: BACKEND_ERROR_KEYS,
            expires_session: true,
            on_session_expired: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// JSON fields searched, in order, for a message in error bodies.
    pub fn with_error_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.error_keys = keys;
        self
    }

    /// Whether 401/403 expire the session. When off they are reported as
    /// [`ApiError::Backend`] with the body's message and the session is kept.
    pub fn with_session_expiry(mut self, enabled: bool) -> Self {
        self.expires_session = enabled;
        self
    }

    pub fn on_session_expired(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URLs pass through; anything else is appended to the base URL.
    pub fn url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.base_url, target)
        } else {
            format!("{}/{}", self.base_url, target)
        }
    }

    /// Issue a request, retrying transient failures.
    ///
    /// At most `retries + 1` attempts are made. A 401/403 clears the session,
    /// fires the expiry hook and returns immediately.
    pub async fn request(&self, target: &str, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        let url = self.url(target);
        let token = match &options.auth {
            Auth::Session => self.session.token().await,
            Auth::Token(token) => Some(token.clone()),
            Auth::Anonymous => None,
        };
        let policy = match options.retries {
            Some(retries) => self.retry.clone().with_max_retries(retries),
            None => self.retry.clone(),
        };

        let mut attempt: u32 = 0;
        loop {
            log::debug!(
                "{} {} (attempt {}/{})",
                options.method,
                url,
                attempt + 1,
                policy.max_attempts()
            );
            let request = self.build(&url, &options, token.as_deref())?;

            let failure = match self.attempt(request).await {
                Attempt::Done(result) => return result,
                Attempt::Retry(failure) => failure,
            };

            match policy.next_delay(attempt, &options.method, &failure) {
                Some(delay) => {
                    log::warn!(
                        "{} {} failed on attempt {}/{}: {}; retrying in {}ms",
                        options.method,
                        url,
                        attempt + 1,
                        policy.max_attempts(),
                        failure,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    log::error!(
                        "{} {} gave up after {} attempt(s): {}",
                        options.method,
                        url,
                        attempt + 1,
                        failure
                    );
                    return Err(ApiError::Connectivity {
                        attempts: attempt + 1,
                        cause: failure.to_string(),
                    });
                }
            }
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::get()).await?.json()
    }

    /// Send `body` as JSON with `method` and decode the response.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::new(method).json(body)?;
        self.request(path, options).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    /// DELETE `path`. Any success body is discarded.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(path, RequestOptions::new(Method::DELETE))
            .await
            .map(|_| ())
    }

    /// POST a multipart form and decode the JSON response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        body: MultipartBody,
    ) -> Result<T, ApiError> {
        let options = RequestOptions::new(Method::POST).multipart(body);
        self.request(path, options).await?.json()
    }

    /// GET raw bytes (receipts and other downloads).
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        self.request(path, RequestOptions::get()).await?.into_bytes()
    }

    fn build(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        let mut headers = options.headers.clone();

        if !matches!(options.body, RequestBody::Multipart(_)) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("{} {}", AUTH_SCHEME, token))
                .map_err(|_| ApiError::InvalidRequest("token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .client
            .request(options.method.clone(), url)
            .headers(headers);

        // GET never carries a body.
        if options.method != Method::GET {
            builder = match &options.body {
                RequestBody::None => builder,
                RequestBody::Json(value) => builder.body(value.to_string()),
                RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
            };
        }
        Ok(builder)
    }

    async fn attempt(&self, request: RequestBuilder) -> Attempt {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(Failure::Network(e.to_string())),
        };

        let status = response.status();
        let rejected = status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN;
        if rejected && self.expires_session {
            return Attempt::Done(Err(self.expire_session(status).await));
        }
        if status.is_server_error() {
            let message = self.error_message(status, response).await;
            return Attempt::Retry(Failure::Server { status, message });
        }
        if !status.is_success() {
            let message = self.error_message(status, response).await;
            return Attempt::Done(Err(ApiError::Backend { status, message }));
        }
        read_success(status, response).await
    }

    async fn expire_session(&self, status: StatusCode) -> ApiError {
        let had_session = self.session.expire().await;
        log::info!(
            "Backend rejected the credential ({}); session cleared (was active: {})",
            status,
            had_session
        );
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
        ApiError::SessionExpired { status }
    }

    async fn error_message(&self, status: StatusCode, response: Response) -> String {
        match response.bytes().await {
            Ok(body) => extract_error_message(&body, self.error_keys)
                .unwrap_or_else(|| status_fallback(status)),
            Err(_) => status_fallback(status),
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("smartcondo-console/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn read_success(status: StatusCode, response: Response) -> Attempt {
    if status == StatusCode::NO_CONTENT {
        return Attempt::Done(Ok(ApiResponse::Empty));
    }
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match response.bytes().await {
        Ok(body) => Attempt::Done(decode_body(&content_type, &body)),
        // The connection dropped mid-body: as transient as a failed connect.
        Err(e) => Attempt::Retry(Failure::Network(e.to_string())),
    }
}

/// Turn a 2xx body into an [`ApiResponse`] according to its content type.
pub(crate) fn decode_body(content_type: &str, body: &[u8]) -> Result<ApiResponse, ApiError> {
    if body.is_empty() {
        return Ok(ApiResponse::Empty);
    }
    if content_type.contains("json") {
        return serde_json::from_slice(body)
            .map(ApiResponse::Json)
            .map_err(|e| ApiError::Decode(format!("malformed JSON body: {}", e)));
    }
    if content_type.is_empty() || content_type.starts_with("text/") {
        return Ok(match String::from_utf8(body.to_vec()) {
            Ok(text) => ApiResponse::Text(text),
            Err(e) => ApiResponse::Bytes(e.into_bytes()),
        });
    }
    Ok(ApiResponse::Bytes(body.to_vec()))
}
