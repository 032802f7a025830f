//! # Error Types
//!
//! Error taxonomy shared by every Janus crate.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  janus-core errors (this file)                                         │
//! │  ├── ConfigError      - Fatal, detected before serving starts          │
//! │  ├── ValidationError  - Payload rule violations                        │
//! │  └── AppError         - Per-request result (validation / not found /   │
//! │                         timeout / internal) with an error code         │
//! │                                                                         │
//! │  janus-host errors (separate crate)                                    │
//! │  └── HostError        - Bind / TLS / transport failures (fatal)        │
//! │                                                                         │
//! │  Flow: ValidationError → AppError → HTTP status / gRPC status          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (key, field, executor tag)
//! 3. Per-request errors never cross back into the lifecycle coordinator
//! 4. Each `ErrorKind` maps to exactly one HTTP and one gRPC status

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Error code used when a handler does not supply one.
pub const DEFAULT_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// Error code attached to validation failures.
pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_FAILED";

// =============================================================================
// Config Error
// =============================================================================

/// Startup configuration errors.
///
/// Every variant is fatal: the process logs it and exits non-zero before
/// any listener is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither protocol ends up with a usable port.
    ///
    /// ## When This Occurs
    /// - Both ports are 0 or negative
    /// - One port is set but its protocol is disabled, and the other is 0
    /// - Both protocols are disabled
    #[error("no listener configured: at least one of grpc-port/rest-port must be > 0 and enabled")]
    NoPortsEnabled,

    /// Only one half of the certificate/key pair was supplied.
    #[error("incomplete TLS configuration: {missing} is missing")]
    IncompleteTls { missing: &'static str },

    /// A client CA was supplied without a server certificate.
    #[error("tls-ca requires tls-certificate and tls-key")]
    CaWithoutCertificate,

    /// A setting has a value that cannot be parsed.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A settings segment is not a `key=value` pair.
    #[error("malformed setting {0:?}: expected key=value")]
    MalformedSetting(String),

    /// The same executor type was registered twice.
    ///
    /// ## When This Occurs
    /// ```text
    /// registry.bundle(store).with::<CreateNote>()?
    ///                       .with::<CreateNote>()?   ◄── here
    /// ```
    #[error("executor {0} is already registered")]
    DuplicateRegistration(String),

    /// A format registry was installed after the shared one was frozen.
    #[error("format registry already installed or in use")]
    FormatsAlreadyInstalled,
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Returned by [`crate::validation::Validate`] implementations. The host
/// turns them into HTTP 400 or gRPC `InvalidArgument` before the handler
/// runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value does not match a registered format.
    #[error("{field} is not a valid {format}")]
    InvalidFormat { field: String, format: String },

    /// A validator referenced a format nobody registered.
    #[error("unknown format {format} for {field}")]
    UnknownFormat { field: String, format: String },

    /// Anything else.
    #[error("{0}")]
    Custom(String),
}

// =============================================================================
// Application Error
// =============================================================================

/// Category of a per-request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller sent something unacceptable.
    Validation,
    /// The addressed resource does not exist.
    NotFound,
    /// The per-call deadline elapsed.
    Timeout,
    /// Everything else, including recovered panics.
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Timeout => 504,
            ErrorKind::Internal => 500,
        }
    }

    /// Message used when the caller does not provide one.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "Invalid request",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Uniform failure result returned by handlers and executors.
///
/// ## Example
/// ```rust
/// use janus_core::error::{AppError, ErrorKind};
///
/// let err = AppError::not_found("note 42 does not exist").with_code("NOTE_NOT_FOUND");
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.code(), "NOTE_NOT_FOUND");
/// assert_eq!(err.kind().http_status(), 404);
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} error [{code}]: {message}")]
pub struct AppError {
    kind: ErrorKind,
    code: String,
    message: String,
}

impl AppError {
    /// Builds an error of the given kind with the default code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            code: DEFAULT_ERROR_CODE.to_string(),
            message: if message.is_empty() {
                kind.default_message().to_string()
            } else {
                message
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Replaces the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation | ErrorKind::NotFound)
    }

    /// JSON body sent to REST callers.
    pub fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            message: &self.message,
            error_code: &self.code,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string()).with_code(VALIDATION_ERROR_CODE)
    }
}

/// Wire shape of a REST error response.
///
/// ```json
/// { "message": "title is required", "errorCode": "VALIDATION_FAILED" }
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody<'a> {
    pub message: &'a str,
    pub error_code: &'a str,
}

/// Result type for request handling.
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// Protocol Conversions
// =============================================================================

#[cfg(feature = "tonic")]
impl From<AppError> for tonic::Status {
    fn from(err: AppError) -> Self {
        let code = match err.kind {
            ErrorKind::Validation => tonic::Code::InvalidArgument,
            ErrorKind::NotFound => tonic::Code::NotFound,
            ErrorKind::Timeout => tonic::Code::DeadlineExceeded,
            ErrorKind::Internal => tonic::Code::Internal,
        };
        tonic::Status::new(code, err.message)
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.kind.http_status())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.body())).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_code_and_message() {
        let err = AppError::internal("");
        assert_eq!(err.code(), DEFAULT_ERROR_CODE);
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(AppError::validation("x").kind().http_status(), 400);
        assert_eq!(AppError::not_found("x").kind().http_status(), 404);
        assert_eq!(AppError::timeout("x").kind().http_status(), 504);
        assert_eq!(AppError::internal("x").kind().http_status(), 500);
    }

    #[test]
    fn test_validation_error_converts_with_code() {
        let err: AppError = ValidationError::Required {
            field: "title".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), VALIDATION_ERROR_CODE);
        assert_eq!(err.message(), "title is required");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_error_body_serializes_camel_case() {
        let err = AppError::not_found("missing").with_code("NOTE_NOT_FOUND");
        let json = serde_json::to_value(err.body()).unwrap();
        assert_eq!(json["message"], "missing");
        assert_eq!(json["errorCode"], "NOTE_NOT_FOUND");
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::invalid("grpc-port", "abc", "not a number");
        assert_eq!(
            err.to_string(),
            "invalid value for grpc-port: \"abc\" (not a number)"
        );
        assert_eq!(
            ConfigError::IncompleteTls { missing: "tls-key" }.to_string(),
            "incomplete TLS configuration: tls-key is missing"
        );
    }

    #[cfg(feature = "tonic")]
    #[test]
    fn test_grpc_status_mapping() {
        let status: tonic::Status = AppError::validation("bad").into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        let status: tonic::Status = AppError::not_found("gone").into();
        assert_eq!(status.code(), tonic::Code::NotFound);
        let status: tonic::Status = AppError::timeout("slow").into();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
        let status: tonic::Status = AppError::internal("boom").into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}
