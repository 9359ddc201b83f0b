//! REST API Error Types
//!
//! Maps gateway errors and request-body rejections to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Error body: `{"detail": "...", "code": "..."}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub detail: String,
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.into(),
        }
    }
}

/// REST API error that can be returned from handlers
#[derive(Debug)]
pub struct RestError {
    pub status: StatusCode,
    pub error: ApiError,
}

impl RestError {
    pub fn bad_request(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(code, detail),
        }
    }

    pub fn internal(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new(code, detail),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

// Conversions from domain errors
impl From<GatewayError> for RestError {
    fn from(err: GatewayError) -> Self {
        if err.is_client_error() {
            RestError::bad_request(err.code(), err.to_string())
        } else {
            RestError::internal(err.code(), err.to_string())
        }
    }
}

/// Malformed bodies are input errors: always 400, never axum's 415/422.
impl From<JsonRejection> for RestError {
    fn from(rejection: JsonRejection) -> Self {
        RestError::bad_request("VALIDATION_ERROR", rejection.body_text())
    }
}
