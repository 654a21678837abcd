use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use marquee_core::{LookupError, types::ListReferenceError};

pub type AppResult<T> = Result<T, AppError>;

/// Request failure rendered as `{"error": {"message", "status"}}`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    status: u16,
}

impl AppError {
    fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::REQUEST_TIMEOUT, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope {
            error: ErrorBody {
                message: &self.message,
                status: self.status.as_u16(),
            },
        });
        (self.status, body).into_response()
    }
}

impl From<ListReferenceError> for AppError {
    fn from(err: ListReferenceError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidTitle => AppError::bad_request("Movie title is required"),
            LookupError::Timeout(deadline) => AppError::request_timeout(format!(
                "Request timed out after {} seconds",
                deadline.as_secs()
            )),
        }
    }
}
