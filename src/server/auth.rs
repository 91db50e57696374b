//! Constant-time API-key auth, adapted from the teacher's Bearer-extraction
//! `auth_middleware` — a single static key instead of JWT claims, since spec
//! §6.1 calls for `X-API-Key` or `Authorization: Bearer <key>` compared
//! against one configured secret. Skipped entirely when no key is
//! configured ("local-dev mode"); `/health` never reaches this layer since
//! it is mounted outside `/api/v1`.

use crate::domain::error::Error;
use crate::server::envelope::ApiError;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub api_key: Option<Arc<str>>,
}

pub async fn auth_middleware(State(state): State<AuthState>, req: Request, next: Next) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    match extract_key(req.headers()) {
        Some(provided) if constant_time_eq(provided.as_bytes(), expected.as_bytes()) => Ok(next.run(req).await),
        _ => Err(ApiError(Error::Unauthenticated)),
    }
}

fn extract_key(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        return Some(v.to_string());
    }
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).and_then(|v| v.strip_prefix("Bearer ")).map(str::to_string)
}

/// XOR-accumulate comparison: never short-circuits on the first mismatching
/// byte, so timing doesn't leak how many leading bytes matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_rejects_different_lengths() {
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn constant_time_eq_accepts_equal_bytes() {
        assert!(constant_time_eq(b"secret-key", b"secret-key"));
    }

    #[test]
    fn constant_time_eq_rejects_single_byte_difference() {
        assert!(!constant_time_eq(b"secret-key", b"secret-kez"));
    }
}
