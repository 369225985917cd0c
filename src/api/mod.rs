//! API client module for the Smart Condominium console.
//!
//! Provides the authenticated HTTP client (token injection, session expiry,
//! retry with backoff), typed endpoint helpers for every backend resource, and
//! a client for the AI detection microservice.

pub mod ai;
pub mod auth;
pub mod billing;
pub mod client;
pub mod detection;
pub mod error;
pub mod query;
pub mod reservations;
pub mod resources;
pub mod response;
pub mod retry;
pub mod types;


pub use client::{ApiClient, Auth, FilePart, MultipartBody, RequestBody, RequestOptions};
pub use error::ApiError;
pub use query::Query;
pub use resources::{Resource, ResourceKind};
pub use response::{ApiResponse, Listing, Page};
pub use retry::{Backoff, RetryPolicy};
