//! Error taxonomy for backend calls.
//!
//! Every failure a request can produce ends up as one `ApiError` variant with a
//! human-readable message. Callers branch on the variant, never on the text.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::session::SessionError;

/// JSON fields tried, in order, when the condominium backend rejects a request.
pub const BACKEND_ERROR_KEYS: &[&str] = &["detail", "message", "errors"];

/// JSON fields tried, in order, when the AI microservice rejects a request.
pub const AI_SERVICE_ERROR_KEYS: &[&str] = &["error", "message", "detail"];

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the credential (401/403). The session has been cleared.
    #[error("Session expired. Please log in again.")]
    SessionExpired { status: StatusCode },

    /// Non-retryable rejection (validation, not found, conflict...).
    #[error("{message}")]
    Backend { status: StatusCode, message: String },

    /// Server or transport failures outlasted the retry budget.
    #[error("Could not reach the server after {attempts} attempt(s): {cause}")]
    Connectivity { attempts: u32, cause: String },

    /// A 2xx response whose body could not be decoded.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// The request could not be built (bad multipart part, unreadable file...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The credential store failed while logging in or out.
    #[error("Session storage failed: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }

    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::SessionExpired { status } | ApiError::Backend { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Pull a message out of a JSON error body.
///
/// Each key in `keys` is tried in order. A string value is used as-is; a map
/// (field-level errors) or list yields its first entry in body order,
/// unwrapping one more level when that entry is itself a list of messages.
pub fn extract_error_message(body: &[u8], keys: &[&str]) -> Option<String> {
    let json: Value = serde_json::from_slice(body).ok()?;
    let object = json.as_object()?;

    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(first_message)
}

/// Message used when the body carries nothing usable.
pub fn status_fallback(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown status")
    )
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.first().and_then(first_message),
        Value::Object(map) => map.values().next().and_then(first_message),
        _ => None,
    }
}
