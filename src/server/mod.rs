//! HTTP surface: three POST entry points over axum.
//!
//! Handlers validate input, delegate to the injected services, and convert
//! every failure into a JSON `{"error": ...}` body exactly once via
//! [`ApiError`]. No service is constructed per request; everything lives in
//! [`AppState`] behind `Arc`s.

mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::orchestrator::Orchestrator;
use crate::retrieval::RetrievalService;
use crate::syllabus::SyllabusStore;
use crate::types::ServiceError;

/// Shared, immutable service graph handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub retrieval: RetrievalService,
    pub syllabus: Arc<dyn SyllabusStore>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(
        retrieval: RetrievalService,
        syllabus: Arc<dyn SyllabusStore>,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            retrieval,
            syllabus,
            orchestrator,
        }
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(handlers::ingest))
        .route("/search", post(handlers::search))
        .route("/orchestrate", post(handlers::orchestrate))
        .with_state(state)
}

/// Error as it leaves the HTTP boundary.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Request body carried a content type the endpoint does not accept.
    UnsupportedMediaType,
    /// Recognized but unimplemented request shape (multipart uploads).
    NotImplemented(&'static str),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Service(err) => {
                let status = match &err {
                    ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                    ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                    ServiceError::Configuration(_)
                    | ServiceError::Upstream { .. }
                    | ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            Self::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported content type".to_string(),
            ),
            Self::NotImplemented(message) => {
                (StatusCode::NOT_IMPLEMENTED, message.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::debug!(%status, error = %message, "request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
