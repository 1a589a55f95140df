//! Token exchanged through plain request and response headers.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;

use super::{header_text, AuthStrategy, CredentialPolicy, DEFAULT_METHODS};
use crate::error::Result;
use crate::request::ApiRequest;
use crate::types::{Appliance, Credentials};

/// Login with username and password headers, replay a token header.
///
/// The login request is a `POST` without a body. The token comes back in
/// `response_header` and is sent as `request_header` afterwards.
#[derive(Debug, Clone)]
pub struct TokenHeaderAuth {
    appliance: Appliance,
    login_path: String,
    logout_path: Option<String>,
    username_header: HeaderName,
    password_header: HeaderName,
    response_header: HeaderName,
    request_header: HeaderName,
    success_status: StatusCode,
    methods: Vec<Method>,
    policy: CredentialPolicy,
}

impl TokenHeaderAuth {
    /// Create a strategy for `appliance` logging in at `login_path`.
    ///
    /// Defaults: `USERNAME`/`PASSWORD` login headers, `token` response header,
    /// `TOKEN` request header, success status 200, no logout endpoint.
    #[must_use]
    pub fn new(appliance: Appliance, login_path: impl Into<String>) -> Self {
        Self {
            appliance,
            login_path: login_path.into(),
            logout_path: None,
            username_header: HeaderName::from_static("username"),
            password_header: HeaderName::from_static("password"),
            response_header: HeaderName::from_static("token"),
            request_header: HeaderName::from_static("token"),
            success_status: StatusCode::OK,
            methods: DEFAULT_METHODS.to_vec(),
            policy: CredentialPolicy::Required,
        }
    }

    /// Set the logout path (sent as a `POST`).
    #[must_use]
    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = Some(path.into());
        self
    }

    /// Set the headers carrying username and password on login.
    #[must_use]
    pub fn with_login_headers(mut self, username: HeaderName, password: HeaderName) -> Self {
        self.username_header = username;
        self.password_header = password;
        self
    }

    /// Set the response header holding the token and the request header replaying it.
    #[must_use]
    pub fn with_token_headers(mut self, response: HeaderName, request: HeaderName) -> Self {
        self.response_header = response;
        self.request_header = request;
        self
    }

    /// Set the login success status.
    #[must_use]
    pub const fn with_success_status(mut self, status: StatusCode) -> Self {
        self.success_status = status;
        self
    }

    /// Set the accepted HTTP methods.
    #[must_use]
    pub fn with_methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    /// Set the missing-credential policy.
    #[must_use]
    pub const fn with_credential_policy(mut self, policy: CredentialPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl AuthStrategy for TokenHeaderAuth {
    fn appliance(&self) -> Appliance {
        self.appliance
    }

    fn build_login_request(&self, credentials: &Credentials) -> Result<ApiRequest> {
        let username = HeaderValue::from_str(credentials.username())?;
        let mut password = HeaderValue::from_str(credentials.password().expose_secret())?;
        password.set_sensitive(true);

        Ok(ApiRequest::new(Method::POST, self.login_path.as_str())
            .with_header(self.username_header.clone(), username)
            .with_header(self.password_header.clone(), password))
    }

    fn success_status(&self) -> StatusCode {
        self.success_status
    }

    fn extract_credential(&self, headers: &HeaderMap) -> Option<String> {
        header_text(headers, &self.response_header)
    }

    fn credential_header(&self) -> &HeaderName {
        &self.request_header
    }

    fn credential_source(&self) -> &str {
        self.response_header.as_str()
    }

    fn build_logout_request(&self, _credential: Option<&str>) -> Option<ApiRequest> {
        self.logout_path
            .as_deref()
            .map(|path| ApiRequest::new(Method::POST, path))
    }

    fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    fn credential_policy(&self) -> CredentialPolicy {
        self.policy
    }
}
