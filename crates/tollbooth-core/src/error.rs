//! Shared error type across Tollbooth crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid limit or gateway configuration.
    Configuration,
    /// Invalid input / malformed payload.
    BadRequest,
    /// Caller identity could not be resolved.
    AuthFailed,
    /// Quota exhausted for one of the evaluated scopes.
    TooManyRequests,
    /// Payload too large.
    PayloadTooLarge,
    /// Quota backend unreachable, timed out, or returned nonsense.
    Unavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::Configuration => "CONFIGURATION",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status carried in the `code` field of JSON error bodies.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::BadRequest => 400,
            ClientCode::AuthFailed => 401,
            ClientCode::PayloadTooLarge => 413,
            ClientCode::TooManyRequests => 429,
            ClientCode::Unavailable => 503,
            ClientCode::Configuration | ClientCode::Internal => 500,
        }
    }

    /// Reason phrase used as the message prefix in JSON error bodies.
    pub fn reason(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "Bad Request",
            ClientCode::AuthFailed => "Unauthorized",
            ClientCode::PayloadTooLarge => "Payload Too Large",
            ClientCode::TooManyRequests => "Too Many Requests",
            ClientCode::Unavailable => "Service Unavailable",
            ClientCode::Configuration | ClientCode::Internal => "Internal Server Error",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GateError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("configuration: {0}")]
    Config(String),
    #[error("quota store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("quota store inconsistency: {0}")]
    Inconsistent(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("auth failed")]
    AuthFailed,
    #[error("internal: {0}")]
    Internal(String),
}

impl GateError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GateError::Config(_) => ClientCode::Configuration,
            GateError::StoreUnavailable(_) | GateError::Inconsistent(_) => ClientCode::Unavailable,
            GateError::BadRequest(_) => ClientCode::BadRequest,
            GateError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            GateError::AuthFailed => ClientCode::AuthFailed,
            GateError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Errors worth another attempt against the quota store.
    ///
    /// Inconsistent replies are not retried: the script already ran.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GateError::StoreUnavailable(_))
    }
}
