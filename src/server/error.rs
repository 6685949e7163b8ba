//! JSON error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::Error;
use crate::render::validate::FieldErrors;

pub const INVALID_JSON: &str = "INVALID_JSON";
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const MISSING_TEXT: &str = "MISSING_TEXT";
pub const RATE_LIMITED: &str = "RATE_LIMITED";
pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";
pub const GENERATION_ERROR: &str = "GENERATION_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                code: Some(code),
                fields: None,
                message: None,
            },
        }
    }

    pub fn invalid_json() -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_JSON, "Invalid JSON in request body")
    }

    pub fn invalid_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_REQUEST, error)
    }

    pub fn validation(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, VALIDATION_ERROR, error)
    }

    pub fn validation_fields(fields: FieldErrors) -> Self {
        let mut err = Self::validation("Validation failed");
        err.body.fields = Some(fields);
        err
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND, format!("{} not found", what))
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            RATE_LIMITED,
            "Too many requests, please try again later",
        )
    }

    /// Map a library error, logging it. `context` is the public message for
    /// server-side failures; the error text is attached only when `expose`.
    pub fn from_error(err: Error, context: &str, expose: bool) -> Self {
        let mut api = match &err {
            Error::NotFound(kind, _) => return Self::not_found(kind),
            Error::Validation(message) => return Self::validation(message.clone()),
            Error::Timeout(_) => Self::new(StatusCode::REQUEST_TIMEOUT, TIMEOUT_ERROR, context),
            Error::Render(_) | Error::BrowserUnavailable(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERATION_ERROR, context)
            }
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, context),
        };
        tracing::error!(error = %err, "{}", context);
        if expose {
            api.body.message = Some(err.to_string());
        }
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
