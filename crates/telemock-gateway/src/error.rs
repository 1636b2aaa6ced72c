// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`TelemockError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use telemock_bot::ApiResponse;
use telemock_core::TelemockError;

/// Admin REST error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn status_for(err: &TelemockError) -> StatusCode {
    match err {
        TelemockError::NotFound { .. } => StatusCode::NOT_FOUND,
        TelemockError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        TelemockError::InactiveBot { .. } => StatusCode::FORBIDDEN,
        TelemockError::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error returned by admin handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub TelemockError);

impl From<TelemockError> for ApiError {
    fn from(err: TelemockError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Error returned by Bot API handlers, rendered in the Bot API envelope.
#[derive(Debug)]
pub struct BotApiError(pub TelemockError);

impl From<TelemockError> for BotApiError {
    fn from(err: TelemockError) -> Self {
        Self(err)
    }
}

impl BotApiError {
    pub fn description(&self) -> String {
        match &self.0 {
            TelemockError::Unauthorized => "Unauthorized".to_string(),
            TelemockError::InvalidInput(reason) => format!("Bad Request: {reason}"),
            err => {
                let prefix = match status_for(err) {
                    StatusCode::NOT_FOUND => "Not Found",
                    StatusCode::BAD_REQUEST => "Bad Request",
                    StatusCode::FORBIDDEN => "Forbidden",
                    _ => "Internal Server Error",
                };
                format!("{prefix}: {err}")
            }
        }
    }
}

impl IntoResponse for BotApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "bot api request failed");
        }
        let body: ApiResponse<()> = ApiResponse::error(status.as_u16(), self.description());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            status_for(&TelemockError::not_found("chat", 1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&TelemockError::invalid("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TelemockError::InactiveBot { id: "b".into() }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&TelemockError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&TelemockError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn bot_api_descriptions_are_prefixed() {
        assert_eq!(
            BotApiError(TelemockError::Unauthorized).description(),
            "Unauthorized"
        );
        assert_eq!(
            BotApiError(TelemockError::invalid("text is empty")).description(),
            "Bad Request: text is empty"
        );
    }
}
