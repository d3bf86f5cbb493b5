//! Access to the remote study generation service
//!
//! This module provides:
//! - A resilient request client (per-attempt timeout, retry with backoff, cancellation)
//! - Classified request errors
//! - Wire models for `/upload`, `/generate` and `/health`
//! - Input checks applied before a request is sent

pub mod client;
pub mod error;
pub mod models;
pub mod service;
pub mod validation;

pub use client::{
    ApiRequest, FormField, MultipartForm, RequestBody, RequestClient, RequestOptions,
    DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
pub use error::{RequestError, RequestErrorKind};
pub use models::{
    FileInfo, GenerateRequest, GeneratedMaterial, HealthResponse, HealthStatus, UploadResponse,
};
pub use service::{StudyApi, UploadInput};
pub use validation::InputLimits;
