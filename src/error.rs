//! Errors raised by the REST surface and their HTTP rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Failures of the read-only room services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Listing parameters are out of range.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] ValidationErrors),
    /// No live room carries this name.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
}

/// Error returned by HTTP handlers, rendered as `{"status": .., "message": ..}`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    /// HTTP status this error is rendered with.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ServiceError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            status: self.status.as_u16(),
            message: &self.message,
        });
        (self.status, body).into_response()
    }
}
