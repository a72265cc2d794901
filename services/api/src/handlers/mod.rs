//! Axum Handlers for the REST API
//!
//! Handlers are grouped by concern. Each one carries `utoipa` doc attributes
//! from which the OpenAPI document is generated.

pub mod account;
pub mod catalog;
pub mod conversation;
pub mod progress;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use oratoria_core::catalog::CatalogError;
use tracing::error;

use crate::models::{ErrorResponse, HealthResponse};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// A vendor or LLM call failed. The message is shown to the caller, the
    /// source is only logged.
    Upstream {
        message: String,
        source: anyhow::Error,
    },
    InternalServerError(anyhow::Error),
}

impl ApiError {
    pub fn upstream(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message the caller gets to see.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Upstream { message, .. } => message.clone(),
            ApiError::InternalServerError(_) => "An internal server error occurred.".to_string(),
        }
    }

    /// Maps catalog lookups onto 404s.
    pub fn from_catalog(err: CatalogError) -> Self {
        match err {
            CatalogError::DuplicateId { .. } => Self::InternalServerError(err.into()),
            _ => Self::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Upstream { message, source } => {
                error!(error = ?source, "{}", message);
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
            }
            _ => {}
        }
        let message = self.public_message();
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Fallback for paths without a handler.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
