//! Camera image uploads: face recognition, face enrolment and plate detection.
//!
//! Images are validated locally before anything is sent; the backend stores
//! each detection and returns the resulting record.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::client::{ApiClient, FilePart, MultipartBody};
use super::error::ApiError;
use super::resources::ResourceKind;
use super::types::DetectionRecord;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted MIME types.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

const DEFAULT_CAMERA: &str = "Web App";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid file type {0:?}. Only JPEG, PNG and WebP are allowed")]
    UnsupportedType(String),

    #[error("Image is too large ({size} bytes). Maximum is 5 MB")]
    TooLarge { size: usize },

    #[error("Image is empty")]
    Empty,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

/// A validated image ready to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    file_name: String,
    mime: &'static str,
    data: Vec<u8>,
}

impl ImageUpload {
    /// Read and validate an image file. The type comes from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime = mime_for_extension(extension)
            .ok_or_else(|| ImageError::UnsupportedType(extension.to_string()))?;

        let size = fs::metadata(path)
            .map_err(|source| ImageError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        // Checked before reading so an oversized file is never loaded.
        if size > MAX_IMAGE_BYTES as u64 {
            return Err(ImageError::TooLarge {
                size: usize::try_from(size).unwrap_or(usize::MAX),
            });
        }

        let data = fs::read(path).map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("upload.{}", extension));

        Self::from_bytes(file_name, mime, data)
    }

    /// Validate an in-memory image with an explicit MIME type.
    pub fn from_bytes(file_name: impl Into<String>, mime: &str, data: Vec<u8>) -> Result<Self, ImageError> {
        let mime = ALLOWED_MIME_TYPES
            .iter()
            .copied()
            .find(|allowed| allowed.eq_ignore_ascii_case(mime))
            .ok_or_else(|| ImageError::UnsupportedType(mime.to_string()))?;
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge { size: data.len() });
        }
        Ok(Self {
            file_name: file_name.into(),
            mime,
            data,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &str {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The image as the `image` field of a multipart form.
    pub fn into_form(self) -> MultipartBody {
        MultipartBody::new().file(FilePart {
            field: IMAGE_FIELD.to_string(),
            file_name: self.file_name,
            mime: self.mime.to_string(),
            data: self.data,
        })
    }
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Run face recognition on an image taken by `camera`.
pub async fn recognize_face(
    api: &ApiClient,
    image: ImageUpload,
    camera: Option<&str>,
) -> Result<DetectionRecord, ApiError> {
    let form = image
        .into_form()
        .text("ubicacion_camara", camera.unwrap_or(DEFAULT_CAMERA));
    let record: DetectionRecord = api
        .post_multipart(ResourceKind::ReconocimientoFacial.path(), form)
        .await?;
    log::info!(
        "Face recognition stored (id {:?}, resident: {:?})",
        record.id,
        record.is_resident
    );
    Ok(record)
}

/// Enrol a face profile for user `codigo_usuario`.
pub async fn enroll_face_profile(
    api: &ApiClient,
    image: ImageUpload,
    codigo_usuario: i64,
) -> Result<DetectionRecord, ApiError> {
    let form = image
        .into_form()
        .text("codigo_usuario", codigo_usuario.to_string());
    api.post_multipart(ResourceKind::PerfilFacial.path(), form)
        .await
}

/// Run plate detection on an image taken by `camera`.
pub async fn detect_plate(
    api: &ApiClient,
    image: ImageUpload,
    camera: Option<&str>,
) -> Result<DetectionRecord, ApiError> {
    let form = image
        .into_form()
        .text("ubicacion_camara", camera.unwrap_or(DEFAULT_CAMERA));
    let record: DetectionRecord = api
        .post_multipart(ResourceKind::DeteccionPlaca.path(), form)
        .await?;
    log::info!(
        "Plate detection stored (id {:?}, plate {:?}, authorized: {:?})",
        record.id,
        record.plate,
        record.is_authorized
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockito::Matcher;

    use super::*;
    use crate::api::retry::RetryPolicy;
    use crate::session::{Credential, MemoryStore, Session};

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn accepts_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rostro.JPG");
        fs::write(&path, JPEG).unwrap();

        let image = ImageUpload::from_path(&path).unwrap();
        assert_eq!(image.mime(), "image/jpeg");
        assert_eq!(image.file_name(), "rostro.JPG");
        assert_eq!(image.len(), JPEG.len());
    }

    #[test]
    fn rejects_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rostro.gif");
        fs::write(&path, JPEG).unwrap();

        assert!(matches!(
            ImageUpload::from_path(&path),
            Err(ImageError::UnsupportedType(ext)) if ext == "gif"
        ));
        assert!(matches!(
            ImageUpload::from_bytes("a.bmp", "image/bmp", JPEG.to_vec()),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grande.png");
        fs::write(&path, vec![0u8; MAX_IMAGE_BYTES + 1]).unwrap();

        assert!(matches!(
            ImageUpload::from_path(&path),
            Err(ImageError::TooLarge { size }) if size == MAX_IMAGE_BYTES + 1
        ));
        // Exactly at the limit is fine.
        assert!(ImageUpload::from_bytes("x.png", "image/png", vec![0u8; MAX_IMAGE_BYTES]).is_ok());
        assert!(matches!(
            ImageUpload::from_bytes("x.png", "image/png", Vec::new()),
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ImageUpload::from_path(Path::new("/nonexistent/cara.webp")).unwrap_err();
        assert!(matches!(err, ImageError::Read { .. }));
    }

    #[tokio::test]
    async fn plate_upload_sends_image_and_camera() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/deteccionplaca/")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image"; filename="auto.jpg""#.into()),
                Matcher::Regex(r#"name="ubicacion_camara""#.into()),
                Matcher::Regex("Entrada principal".into()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 9, "placa": "2345XYZ", "confianza": 0.93, "autorizado": true}"#)
            .create_async()
            .await;

        let store = MemoryStore::with_credential(Credential::new("k", Default::default()));
        let api = ApiClient::new(
            &format!("{}/api", server.url()),
            Arc::new(Session::restore(Box::new(store))),
        )
        .with_retry_policy(RetryPolicy::none());

        let image = ImageUpload::from_bytes("auto.jpg", "image/jpeg", JPEG.to_vec()).unwrap();
        let record = detect_plate(&api, image, Some("Entrada principal")).await.unwrap();

        assert_eq!(record.plate.as_deref(), Some("2345XYZ"));
        assert_eq!(record.is_authorized, Some(true));
        mock.assert_async().await;
    }
}
