//! Control-plane error taxonomy.
//!
//! Every failure a handler can surface carries an [`ErrorKind`]: the kind
//! fixes the HTTP status and the machine-readable code in the response
//! body, the message carries the human-readable detail. Domain rules live
//! here too: shard exhaustion is a conflict the caller can act on, a
//! collector without its shard attribute is an operator error, and
//! provisioning failures are logged but never fail signup.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Record absent within the caller's tenant scope.
    NotFound,
    /// Caller is authenticated but not allowed to act on the target.
    Forbidden,
    /// No valid session on the request.
    Unauthorized,
    /// Malformed input: bad id, missing field, unparseable body.
    Invalid,
    /// Every shard in `0..SHARD_COUNT` already serves a tenant.
    ShardsExhausted,
    /// Admin DDL step failed. Logged at team creation, never fatal there;
    /// the bootstrap retries on the next trigger.
    ProvisioningFailed,
    /// An OpAMP agent asked for a config without reporting `hdx.shard_id`.
    AgentMisconfigured,
    /// Request body is not the protobuf the OpAMP endpoint speaks.
    UnsupportedMediaType,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::ShardsExhausted => StatusCode::CONFLICT,
            ErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::ProvisioningFailed
            | ErrorKind::AgentMisconfigured
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code clients and tests match on.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Invalid => "INVALID",
            ErrorKind::ShardsExhausted => "SHARDS_EXHAUSTED",
            ErrorKind::ProvisioningFailed => "PROVISIONING_FAILED",
            ErrorKind::AgentMisconfigured => "AGENT_MISCONFIGURED",
            ErrorKind::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self {
            kind,
            message: message.into(),
        };
        // Server-side faults are errors, caller faults stay at warn.
        match error.kind.status().is_server_error() {
            true => tracing::error!(code = error.kind.code(), "{}", error.message),
            false => tracing::warn!(code = error.kind.code(), "{}", error.message),
        }
        error
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    /// The allocator found no free shard. One fixed message: the remedy
    /// (raise `SHARD_COUNT` or free a shard) is the same every time.
    pub fn shards_exhausted() -> Self {
        Self::new(
            ErrorKind::ShardsExhausted,
            "No free ingestion shard available; every shard already serves a tenant",
        )
    }

    /// A collector requested remote config without identifying its shard.
    pub fn agent_misconfigured(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AgentMisconfigured, msg)
    }

    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedMediaType, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.message.is_empty() {
            self.kind.code().to_string()
        } else {
            self.message
        };
        let body = Json(serde_json::json!({
            "error": {
                "code": self.kind.code(),
                "message": message,
            }
        }));
        (self.kind.status(), body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:#}"))
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::internal(format!("Registry error: {err}"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(format!("JSON error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::unauthorized(format!("Session token rejected: {err}"))
    }
}

impl From<sea_orm::TransactionError<ApiError>> for ApiError {
    fn from(err: sea_orm::TransactionError<ApiError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => db_err.into(),
            sea_orm::TransactionError::Transaction(api_err) => api_err,
        }
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

/// Shorthand for the most common handler bail-outs.
#[macro_export]
macro_rules! not_found {
    ($($arg:tt)*) => { $crate::error::ApiError::not_found(format!($($arg)*)) };
}

#[macro_export]
macro_rules! invalid {
    ($($arg:tt)*) => { $crate::error::ApiError::invalid(format!($($arg)*)) };
}

#[macro_export]
macro_rules! internal {
    ($($arg:tt)*) => { $crate::error::ApiError::internal(format!($($arg)*)) };
}

pub type InternalError = ApiError;
pub type AuthorizationError = ApiError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_the_contract_statuses() {
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::Invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::ShardsExhausted.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorKind::AgentMisconfigured.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::UnsupportedMediaType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::ShardsExhausted.code(), "SHARDS_EXHAUSTED");
        assert_eq!(ErrorKind::ProvisioningFailed.code(), "PROVISIONING_FAILED");
        assert_eq!(ErrorKind::AgentMisconfigured.code(), "AGENT_MISCONFIGURED");
    }

    #[test]
    fn shards_exhausted_is_a_conflict() {
        let err = ApiError::shards_exhausted();
        assert_eq!(err.kind(), ErrorKind::ShardsExhausted);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
