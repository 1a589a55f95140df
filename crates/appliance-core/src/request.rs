//! Request descriptions, per-call options and responses.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};

use crate::error::{Error, Result};
use crate::query::QueryParams;

/// Statuses accepted as success on ordinary calls: 200, 201, 202 and 204.
pub const ACCEPTED_STATUSES: [StatusCode; 4] = [
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::ACCEPTED,
    StatusCode::NO_CONTENT,
];

/// Returns true if `status` is one of [`ACCEPTED_STATUSES`].
#[must_use]
pub fn is_accepted(status: StatusCode) -> bool {
    ACCEPTED_STATUSES.contains(&status)
}

/// Returns true for methods that never carry a body.
#[must_use]
pub fn is_bodyless(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE
}

/// A fully described HTTP call with an already encoded body.
///
/// Authentication strategies produce these for login and logout; the session
/// builds them for ordinary calls after encoding the body with its codec.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path appended to the session base URL
    pub path: String,
    /// Extra headers
    pub headers: HeaderMap,
    /// Query parameters
    pub query: QueryParams,
    /// Raw body
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Create a request without headers, query or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: QueryParams::new(),
            body: None,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }
}

/// Per-call options for [`crate::Session::request`].
///
/// Header overrides are meant for content negotiation on APIs that expose several
/// resource types; authentication headers always win over them.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Header overrides
    pub headers: HeaderMap,
    /// Query parameters
    pub query: QueryParams,
    /// Timeout for this call only
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the `Accept` header.
    ///
    /// # Errors
    ///
    /// Returns an error if `media_type` is not a valid header value.
    pub fn with_accept(self, media_type: &str) -> Result<Self> {
        Ok(self.with_header(ACCEPT, HeaderValue::from_str(media_type)?))
    }

    /// Override the `Content-Type` header.
    ///
    /// # Errors
    ///
    /// Returns an error if `media_type` is not a valid header value.
    pub fn with_content_type(self, media_type: &str) -> Result<Self> {
        Ok(self.with_header(CONTENT_TYPE, HeaderValue::from_str(media_type)?))
    }

    /// Set the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Set a timeout for this call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Outcome of an ordinary call.
///
/// `Empty` and `Rejected` together form the "empty" sentinel: callers that only
/// care about data check [`ApiResponse::is_empty`], callers that need to tell "no
/// data" from "server error" match on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<V> {
    /// Accepted status with a decoded body
    Decoded {
        /// HTTP status
        status: StatusCode,
        /// Decoded body
        value: V,
    },
    /// Accepted status without a body (for example 204)
    Empty {
        /// HTTP status
        status: StatusCode,
    },
    /// Status outside [`ACCEPTED_STATUSES`]
    Rejected {
        /// HTTP status
        status: StatusCode,
        /// Truncated response body
        body: String,
    },
}

impl<V> ApiResponse<V> {
    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Decoded { status, .. } | Self::Empty { status } | Self::Rejected { status, .. } => {
                *status
            }
        }
    }

    /// Returns true for the empty sentinel (no body, or an unacceptable status).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !matches!(self, Self::Decoded { .. })
    }

    /// Returns true if the status was accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// Borrow the decoded value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        match self {
            Self::Decoded { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Take the decoded value, if any.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Decoded { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Strict reading: an unacceptable status becomes an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedStatus`] for [`ApiResponse::Rejected`].
    pub fn into_result(self) -> Result<Option<V>> {
        match self {
            Self::Decoded { value, .. } => Ok(Some(value)),
            Self::Empty { .. } => Ok(None),
            Self::Rejected { status, body } => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}
