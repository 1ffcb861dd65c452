//! Maps `IdpError` onto the HTTP-style responses described in
//! SPEC_FULL.md §7: a status code plus a short, internal-identifier-free
//! `{"error": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use idp_core::error::IdpError;

pub struct ApiError(pub IdpError);

impl From<IdpError> for ApiError {
    fn from(err: IdpError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.public_message() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
