// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`TripcastError`] onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tripcast_core::TripcastError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Handler error wrapper.
#[derive(Debug)]
pub struct ApiError(pub TripcastError);

impl From<TripcastError> for ApiError {
    fn from(e: TripcastError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TripcastError::NotFound { .. } => StatusCode::NOT_FOUND,
            TripcastError::Validation(_) => StatusCode::BAD_REQUEST,
            TripcastError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
            TripcastError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            TripcastError::Config(_)
            | TripcastError::Gateway { .. }
            | TripcastError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_status_codes() {
        assert_eq!(
            ApiError(TripcastError::upload_not_found("u1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(TripcastError::Config("no template".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(TripcastError::Storage {
                source: "disk full".into()
            })
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(TripcastError::Validation("bad date".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("something went wrong"));
    }
}
