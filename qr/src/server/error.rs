//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::submit::SubmitError;

/// Errors returned by handlers, rendered as `{"detail": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Submission(#[from] SubmitError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Submission(SubmitError::NoSession) => StatusCode::BAD_REQUEST,
            ApiError::Submission(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(json!({"detail": self.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Submission(SubmitError::Status {
                status: 502,
                body: "bad gateway".into()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Submission(SubmitError::NoSession).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_submission_detail_text() {
        let err = ApiError::Submission(SubmitError::Decode("expected value".into()));
        assert!(err.to_string().starts_with("Submission failed"));
    }
}
