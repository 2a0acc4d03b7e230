//! Top-level failure type for the portal binaries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::intake::ImportError;

/// Anything that can abort process startup or a request at the outer edge.
/// Workflow-level errors never reach this type; the review and admin
/// routers map their own enums to responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("log pipeline setup failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("account seeding failed: {0}")]
    Seed(#[from] ImportError),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("http server failure: {0}")]
    Server(#[from] axum::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            // Bad seed data is a client-side problem when it arrives over
            // the wire; everything else here is operational.
            AppError::Seed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
