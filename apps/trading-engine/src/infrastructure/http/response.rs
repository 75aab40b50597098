//! HTTP response DTOs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::use_cases::ControlError;
use crate::domain::risk_management::TradingConfig;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Response from `run` and `stop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Always true; failures use [`ErrorResponse`].
    pub ok: bool,
    /// Configuration after the change.
    pub config: TradingConfig,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false.
    pub ok: bool,
    /// Error message.
    pub error: String,
}

/// Error returned from handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Control service failure.
    Control(ControlError),
    /// Malformed request body.
    BadRequest(String),
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        Self::Control(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Control(ControlError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
            }
            Self::Control(err @ ControlError::InvalidConfig(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Control(ControlError::Store(err)) => {
                tracing::error!(error = %err, "State store failure in control call");
                (StatusCode::INTERNAL_SERVER_ERROR, "state store unavailable".to_string())
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (
            status,
            Json(ErrorResponse {
                ok: false,
                error: message,
            }),
        )
            .into_response()
    }
}
