//! services/api/src/web/error.rs
//!
//! The single error type handlers return. Every error leaves the service as a
//! JSON object with a `message` field and the status the taxonomy assigns:
//! validation and duplicate-key failures are 400, missing records 404,
//! authentication failures 401, everything unclassified 500 with a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sis_core::ports::PortError;
use tracing::error;

#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Please log in".to_string(),
        }
    }

    pub fn invalid_credentials() -> Self {
        // One message for unknown email and wrong password alike, so the
        // login path cannot be used to enumerate accounts.
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid email or password".to_string(),
        }
    }
}

impl From<PortError> for HttpError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(message) => Self {
                status: StatusCode::NOT_FOUND,
                message,
            },
            PortError::Duplicate(message) | PortError::Validation(message) => Self {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            PortError::Unauthorized => Self::unauthorized(),
            PortError::Unexpected(detail) => {
                error!("Unexpected store error: {detail}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}
