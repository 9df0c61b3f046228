//! Mapping of configuration errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use meterdisplay_core::ConfigError;

/// Error returned by route handlers.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ConfigError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConfigError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ConfigError::Stale { .. } => StatusCode::CONFLICT,
            ConfigError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = match &self.0 {
            ConfigError::Invalid(validation) => serde_json::json!({
                "error": self.0.to_string(),
                "violations": validation.messages(),
            }),
            _ => serde_json::json!({ "error": self.0.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
