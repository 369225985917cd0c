//! Decoded response bodies.
//!
//! Shape decisions (JSON vs text vs binary, paginated vs bare list) are made once
//! here so callers work with one type per endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    /// 204 No Content, or a 2xx with a zero-length body.
    Empty,
}

impl ApiResponse {
    /// Decode the body into `T`.
    ///
    /// `Empty` decodes as JSON `null`, so `()` and `Option<_>` targets accept it.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            ApiResponse::Json(value) => value,
            ApiResponse::Empty => Value::Null,
            ApiResponse::Text(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::Decode(format!("expected JSON, got text ({})", e)))?,
            ApiResponse::Bytes(_) => {
                return Err(ApiError::Decode("expected JSON, got binary content".into()))
            }
        };
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Raw bytes of a binary (or text) body.
    pub fn into_bytes(self) -> Result<Vec<u8>, ApiError> {
        match self {
            ApiResponse::Bytes(bytes) => Ok(bytes),
            ApiResponse::Text(text) => Ok(text.into_bytes()),
            ApiResponse::Empty => Ok(Vec::new()),
            ApiResponse::Json(_) => Err(ApiError::Decode(
                "expected binary content, got JSON".into(),
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ApiResponse::Empty)
    }
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

/// A collection endpoint's answer: either a paginated envelope or a bare array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paged(Page<T>),
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Listing::Paged(page) => &page.results,
            Listing::Bare(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Paged(page) => page.results,
            Listing::Bare(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Server-side total when paginated, otherwise the number of items received.
    pub fn total(&self) -> u64 {
        match self {
            Listing::Paged(Page {
                count: Some(count), ..
            }) => *count,
            _ => self.len() as u64,
        }
    }

    pub fn next_page(&self) -> Option<&str> {
        match self {
            Listing::Paged(page) => page.next.as_deref(),
            Listing::Bare(_) => None,
        }
    }

    pub fn previous_page(&self) -> Option<&str> {
        match self {
            Listing::Paged(page) => page.previous.as_deref(),
            Listing::Bare(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Rol {
        id: i64,
        descripcion: String,
    }

    #[test]
    fn paginated_body_stays_paginated() {
        let body = json!({
            "results": [{"id": 1, "descripcion": "Administrador"}],
            "count": 5,
            "next": null,
            "previous": null
        });
        let listing: Listing<Rol> = ApiResponse::Json(body).json().unwrap();

        match &listing {
            Listing::Paged(page) => {
                assert_eq!(page.count, Some(5));
                assert_eq!(page.results.len(), 1);
            }
            Listing::Bare(_) => panic!("paginated body collapsed to a bare list"),
        }
        assert_eq!(listing.total(), 5);
        assert_eq!(listing.next_page(), None);
    }

    #[test]
    fn bare_array_decodes() {
        let body = json!([
            {"id": 1, "descripcion": "Administrador"},
            {"id": 2, "descripcion": "Copropietario"}
        ]);
        let listing: Listing<Rol> = ApiResponse::Json(body).json().unwrap();
        assert!(matches!(listing, Listing::Bare(_)));
        assert_eq!(listing.total(), 2);
        assert_eq!(listing.into_items()[1].descripcion, "Copropietario");
    }

    #[test]
    fn page_without_count_reports_item_count() {
        let body = json!({"results": [{"id": 3, "descripcion": "Guardia"}], "next": "http://x/?page=2"});
        let listing: Listing<Rol> = ApiResponse::Json(body).json().unwrap();
        assert_eq!(listing.total(), 1);
        assert_eq!(listing.next_page(), Some("http://x/?page=2"));
    }

    #[test]
    fn empty_decodes_to_unit() {
        let unit: () = ApiResponse::Empty.json().unwrap();
        assert_eq!(unit, ());
        let nothing: Option<Rol> = ApiResponse::Empty.json().unwrap();
        assert!(nothing.is_none());
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let err = ApiResponse::Json(json!({"unexpected": true}))
            .json::<Rol>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn bytes_are_not_json() {
        let err = ApiResponse::Bytes(vec![0x25, 0x50]).json::<Rol>().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(
            ApiResponse::Bytes(vec![1, 2]).into_bytes().unwrap(),
            vec![1, 2]
        );
    }
}
