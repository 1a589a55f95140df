//! Error types for appliance sessions.
//!
//! Errors fall into four kinds: configuration problems detected before any I/O,
//! authentication failures, request failures (invalid calls and transport problems)
//! and response failures (undecodable bodies, statuses a caller chose to treat as
//! errors). Unacceptable HTTP statuses on ordinary calls are *not* errors; they are
//! reported through [`crate::ApiResponse::Rejected`].

use thiserror::Error;

/// Main error type for appliance operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid or incomplete configuration (for example a missing base URL)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Login could not be completed (transport failure or missing credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Login answered with a status other than the strategy's success status
    #[error("Login rejected with HTTP {status}: {message}")]
    LoginRejected {
        /// HTTP status returned by the login endpoint
        status: u16,
        /// Truncated response body
        message: String,
    },

    /// Login succeeded but the expected credential header was absent
    #[error("Login response carried no `{0}` header")]
    MissingCredential(String),

    /// The last login failed; calls are refused until a login succeeds
    #[error("Session is not authenticated after a failed login")]
    LoginRequired,

    /// HTTP method outside the appliance's allow-list
    #[error("HTTP method {method} is not supported by {appliance}")]
    MethodNotAllowed {
        /// Rejected method
        method: String,
        /// Appliance whose allow-list rejected it
        appliance: String,
    },

    /// A body was supplied on a body-less method
    #[error("HTTP {0} requests cannot carry a body")]
    BodyNotAllowed(String),

    /// The session was logged out and can no longer issue calls
    #[error("Session is closed")]
    SessionClosed,

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Appliance could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Header name or value could not be represented on the wire
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Target URL could not be built
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Request body could not be encoded
    #[error("Failed to encode request body: {0}")]
    EncodeError(String),

    /// Response body could not be decoded
    #[error("Failed to decode response body: {0}")]
    DecodeError(String),

    /// Status outside the accepted set, surfaced on request of the caller
    #[error("Unexpected HTTP status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status returned by the appliance
        status: u16,
        /// Truncated response body
        message: String,
    },
}

/// Specialized result type for appliance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal configuration problem, not retryable
    Configuration,
    /// Login failure; the session must not continue unauthenticated
    Authentication,
    /// Invalid call or transport failure
    Request,
    /// Response that could not be used
    Response,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::LoginRejected { .. } => "LOGIN_REJECTED",
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::LoginRequired => "LOGIN_REQUIRED",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::BodyNotAllowed(_) => "BODY_NOT_ALLOWED",
            Self::SessionClosed => "SESSION_CLOSED",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::InvalidHeader(_) => "INVALID_HEADER",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::EncodeError(_) => "ENCODE_ERROR",
            Self::DecodeError(_) => "DECODE_ERROR",
            Self::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Configuration,
            Self::AuthenticationFailed(_)
            | Self::LoginRejected { .. }
            | Self::MissingCredential(_)
            | Self::LoginRequired => ErrorKind::Authentication,
            Self::MethodNotAllowed { .. }
            | Self::BodyNotAllowed(_)
            | Self::SessionClosed
            | Self::HttpError(_)
            | Self::Timeout(_)
            | Self::ServiceUnavailable(_)
            | Self::InvalidHeader(_)
            | Self::InvalidEndpoint(_)
            | Self::EncodeError(_) => ErrorKind::Request,
            Self::DecodeError(_) | Self::UnexpectedStatus { .. } => ErrorKind::Response,
        }
    }

    /// Returns true for authentication errors.
    #[must_use]
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Authentication)
    }

    /// Returns true for request errors.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Request)
    }

    /// Returns true if the session state is suspect after this error.
    ///
    /// Scoped sessions skip the logout call when they exit with such an error.
    #[must_use]
    pub const fn poisons_session(&self) -> bool {
        self.is_authentication_error() || self.is_request_error()
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}
