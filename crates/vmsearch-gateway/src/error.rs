use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use vmsearch_core::error::{BackendError, SearchError};

/// Message sent in place of the error text when details are not exposed.
pub const GENERIC_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Engine(#[from] BackendError),

    #[error("Search engine reported itself unhealthy")]
    EngineUnhealthy,

    #[error("Route {0} not found")]
    RouteNotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Engine(_) | Self::EngineUnhealthy => StatusCode::SERVICE_UNAVAILABLE,
            Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for the `error` field of the envelope.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Search(_) => "Search failed",
            Self::Engine(_) | Self::EngineUnhealthy => "Search engine unavailable",
            Self::RouteNotFound(_) => "Not Found",
            Self::BadRequest(_) => "Bad Request",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub message: String,
}

/// A `GatewayError` on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    error: GatewayError,
    expose_details: bool,
}

impl ApiError {
    pub fn new(error: impl Into<GatewayError>, expose_details: bool) -> Self {
        Self { error: error.into(), expose_details }
    }

    pub fn error(&self) -> &GatewayError {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let detail = self.error.to_string();

        if status.is_server_error() {
            tracing::error!(status_code = status.as_u16(), error = %detail, "Request failed");
        }

        // these only echo back the caller's own input
        let echoes_input = matches!(self.error, GatewayError::RouteNotFound(_) | GatewayError::BadRequest(_));
        let message = if self.expose_details || echoes_input {
            detail
        } else {
            GENERIC_MESSAGE.to_string()
        };

        (status, Json(ErrorEnvelope { error: self.error.title(), message })).into_response()
    }
}
