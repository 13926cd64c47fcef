//! Error types for the HTTP layer

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::generation::{FailureKind, InvalidLanguage, InvocationError};

/// Header / trailer carrying the final outcome of a generation
pub const GENERATOR_STATUS: &str = "x-generator-status";
/// Header / trailer carrying the generator's exit code when it is known
pub const GENERATOR_EXIT_CODE: &str = "x-generator-exit-code";
/// Value of [`GENERATOR_STATUS`] for a successful run
pub const STATUS_SUCCESS: &str = "success";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to create output directory: {0}")]
    OutputDirectory(#[source] std::io::Error),

    #[error(transparent)]
    InvalidLanguage(#[from] InvalidLanguage),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::OutputDirectory(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidLanguage(_) => StatusCode::BAD_REQUEST,
            ApiError::Invocation(e) => match e.kind() {
                FailureKind::Tool => StatusCode::BAD_GATEWAY,
                FailureKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
                FailureKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                FailureKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Value for [`GENERATOR_STATUS`], if a generation was attempted
    pub fn generator_status(&self) -> Option<&'static str> {
        match self {
            ApiError::Invocation(e) => Some(e.kind().as_str()),
            ApiError::Internal(_) => Some(FailureKind::Infrastructure.as_str()),
            ApiError::OutputDirectory(_) | ApiError::InvalidLanguage(_) => None,
        }
    }
}

/// Outcome headers for a finished generation: status label plus exit code when known
pub fn outcome_headers(outcome: &Result<(), ApiError>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let status = match outcome {
        Ok(()) => Some(STATUS_SUCCESS),
        Err(e) => e.generator_status(),
    };
    if let Some(status) = status {
        headers.insert(GENERATOR_STATUS, HeaderValue::from_static(status));
    }
    if let Err(ApiError::Invocation(e)) = outcome {
        if let Some(code) = e.exit_code() {
            headers.insert(GENERATOR_EXIT_CODE, HeaderValue::from(code));
        }
    }
    headers
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body_text = self.to_string();
        let mut headers = outcome_headers(&Err(self));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        (status, headers, body_text).into_response()
    }
}
