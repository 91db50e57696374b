//! The uniform response envelope every HTTP endpoint returns (spec §6.1):
//! `{status: "ok"|"error", result?, error?, time, usage?}`.

use crate::domain::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

pub fn ok<T: Serialize>(result: T) -> Json<Envelope<T>> {
    Json(Envelope { status: "ok", result: Some(result), error: None, time: Utc::now(), usage: None })
}

/// Wraps a domain [`Error`] so it can be returned directly from a handler via
/// `?`; renders as the envelope's `error` branch at the status `Error::code`
/// maps to (spec §6.1's error-code table).
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Envelope<()> = Envelope {
            status: "error",
            result: None,
            error: Some(ErrorBody { code: code.as_str(), message: self.0.to_string(), details: None }),
            time: Utc::now(),
            usage: None,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;
