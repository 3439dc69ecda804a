//! Error type for the HTTP layer.
//!
//! Handlers return [`ApiResult`] and use `?`; the [`IntoResponse`] impl picks
//! the status code and keeps internal detail out of the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::api::ErrorResponse;
use thiserror::Error;

use crate::calendar::{UpstreamError, WindowOverflow};
use crate::normalize::NormalizeError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch calendar events";

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or wrong `x-api-key`
    #[error("Unauthorized")]
    Unauthorized,

    /// Credential, transport or provider failure
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Lookahead end outside the representable date range
    #[error("Window error: {0}")]
    Window(#[from] WindowOverflow),

    /// Malformed event under the `fail` policy
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE),
            Self::Upstream(e) => {
                tracing::error!("Error fetching events: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE)
            }
            Self::Window(e) => {
                tracing::error!("Error computing query window: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE)
            }
            Self::Normalize(e) => {
                tracing::error!("Error normalizing events: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE)
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, AppError>;
