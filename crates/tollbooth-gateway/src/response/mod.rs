//! Turns admission verdicts into HTTP headers and ready-made responses.
//!
//! Per evaluated scope three headers are emitted:
//! `<prefix>-<display>-Limit`, `<prefix>-<display>-Remaining-Limit` and
//! `<prefix>-<display>-Remaining-Limit-TTL-Millis`. A rejection additionally
//! carries `RateLimit-Reset` in whole seconds (rounded up, at least 1).

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tollbooth_core::error::{ClientCode, GateError};

use crate::admission::ScopeOutcome;
use crate::registry::LimitDefinition;

pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ClientCode, detail: &str) -> Self {
        Self {
            code: code.http_status(),
            message: format!("{}: {detail}", code.reason()),
        }
    }
}

fn json_error(code: ClientCode, detail: &str) -> Response {
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::new(code, detail))).into_response()
}

/// Merge the quota headers of every outcome into `headers`.
pub fn decorate(headers: &mut HeaderMap, outcomes: &[ScopeOutcome]) {
    for o in outcomes {
        insert_scope(headers, &o.limit, o.result.remaining, o.result.window_ttl);
    }
}

fn insert_scope(headers: &mut HeaderMap, limit: &LimitDefinition, remaining: u64, ttl: Duration) {
    let h = &limit.headers;
    headers.insert(h.limit.clone(), HeaderValue::from(limit.quota));
    headers.insert(h.remaining.clone(), HeaderValue::from(remaining));
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    headers.insert(h.remaining_ttl.clone(), HeaderValue::from(ttl_ms));
}

/// Complete 429 for a rejected scope, with headers for the scopes that passed.
///
/// Passed scopes report what they actually have left; the rejecting scope
/// reports 0.
pub fn too_many_requests(evaluated: &[ScopeOutcome], failed: &ScopeOutcome) -> Response {
    let mut resp = json_error(ClientCode::TooManyRequests, &failed.limit.error_message);
    let headers = resp.headers_mut();
    decorate(headers, evaluated);
    insert_scope(headers, &failed.limit, 0, failed.result.window_ttl);
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(failed.result.reset_after_secs()));
    resp
}

/// Fail-closed answer when the quota store cannot be consulted.
pub fn store_unavailable() -> Response {
    json_error(ClientCode::Unavailable, "rate limit backend unavailable")
}

/// Map any request-path error to its JSON response.
pub fn error_response(err: &GateError) -> Response {
    let code = err.client_code();
    let detail = match err {
        GateError::BadRequest(m) => m.clone(),
        GateError::AuthFailed => "caller identity missing".to_string(),
        GateError::PayloadTooLarge => "request body too large".to_string(),
        GateError::StoreUnavailable(_) | GateError::Inconsistent(_) => {
            "rate limit backend unavailable".to_string()
        }
        GateError::Config(_) | GateError::Internal(_) => "unexpected error".to_string(),
    };
    json_error(code, &detail)
}
