//! Client for the AI detection microservice.
//!
//! The microservice lives on its own base URL, reports errors under `error`
//! first, and is never retried. Its 401/403 are ordinary failures and leave
//! the backend session alone.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{ApiClient, RequestOptions};
use super::detection::ImageUpload;
use super::error::{ApiError, AI_SERVICE_ERROR_KEYS};
use super::retry::RetryPolicy;
use crate::session::Session;

const DEFAULT_FACE_CAMERA: &str = "Web App";
const DEFAULT_PLATE_CAMERA: &str = "Estacionamiento";

/// Common wrapper around every microservice reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiEnvelope<T = Value> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> AiEnvelope<T> {
    /// The service's own explanation when `success` is false.
    pub fn failure_reason(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        Some(self.error.as_deref().unwrap_or(self.message.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub confidence: f64,
    pub is_resident: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    pub detection_time: String,
    pub camera_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateMatch {
    pub id: i64,
    pub plate: String,
    pub confidence: f64,
    pub is_authorized: bool,
    #[serde(default)]
    pub vehicle_info: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub detection_time: String,
    pub camera_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRegistration {
    pub profile_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub image_url: String,
    pub registration_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub services: HashMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub version: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Direction of a vehicle passing a plate camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    #[default]
    Entrada,
    Salida,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::Entrada => "entrada",
            AccessType::Salida => "salida",
        }
    }
}

/// Detection microservice client.
#[derive(Debug)]
pub struct AiService {
    root: String,
    api: ApiClient,
}

impl AiService {
    /// `service_base` is the microservice root, e.g. `http://0.0.0.0:8001`.
    /// Endpoints live under `<root>/api`; `/health` and `/info` at the root.
    pub fn new(service_base: &str, session: Arc<Session>) -> Self {
        let root = service_base.trim_end_matches('/').to_string();
        let api = ApiClient::new(&format!("{}/api", root), session)
            .with_error_keys(AI_SERVICE_ERROR_KEYS)
            .with_retry_policy(RetryPolicy::none())
            .with_session_expiry(false);
        Self { root, api }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    // ── Facial recognition ───────────────────────────────────────────────

    pub async fn recognize_face(
        &self,
        image: ImageUpload,
        camera: Option<&str>,
    ) -> Result<AiEnvelope<FaceMatch>, ApiError> {
        let form = image
            .into_form()
            .text("camera_location", camera.unwrap_or(DEFAULT_FACE_CAMERA));
        self.api.post_multipart("/facial/recognize", form).await
    }

    pub async fn register_face(
        &self,
        image: ImageUpload,
        user_id: i64,
    ) -> Result<AiEnvelope<ProfileRegistration>, ApiError> {
        let form = image.into_form().text("user_id", user_id.to_string());
        self.api.post_multipart("/facial/register", form).await
    }

    pub async fn face_profiles(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/facial/profiles").await
    }

    pub async fn delete_face_profile(&self, profile_id: i64) -> Result<AiEnvelope, ApiError> {
        self.envelope(Method::DELETE, &format!("/facial/profiles/{}", profile_id))
            .await
    }

    pub async fn face_stats(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/facial/stats").await
    }

    // ── Plate detection ──────────────────────────────────────────────────

    pub async fn detect_plate(
        &self,
        image: ImageUpload,
        camera: Option<&str>,
        access: AccessType,
    ) -> Result<AiEnvelope<PlateMatch>, ApiError> {
        let form = image
            .into_form()
            .text("camera_location", camera.unwrap_or(DEFAULT_PLATE_CAMERA))
            .text("access_type", access.as_str());
        self.api.post_multipart("/plates/detect", form).await
    }

    pub async fn plate_detections(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/plates/detections").await
    }

    pub async fn plate_stats(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/plates/stats").await
    }

    // ── Statistics ───────────────────────────────────────────────────────

    pub async fn general_stats(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/stats/general").await
    }

    /// Last 24 hours.
    pub async fn today_stats(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/stats/today").await
    }

    /// Last 7 days.
    pub async fn week_stats(&self) -> Result<AiEnvelope, ApiError> {
        self.api.get("/stats/week").await
    }

    // ── Service ──────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.unauthenticated(&format!("{}/health", self.root)).await
    }

    pub async fn info(&self) -> Result<ServiceInfo, ApiError> {
        self.unauthenticated(&format!("{}/info", self.root)).await
    }

    /// Whether `/health` answers at all.
    pub async fn is_available(&self) -> bool {
        match self.health().await {
            Ok(status) => {
                log::debug!("AI service is {}", status.status);
                true
            }
            Err(e) => {
                log::warn!("AI service unavailable: {}", e);
                false
            }
        }
    }

    async fn envelope<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        self.api.request(path, RequestOptions::new(method)).await?.json()
    }

    async fn unauthenticated<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.api
            .request(url, RequestOptions::get().anonymous())
            .await?
            .json()
    }
}
