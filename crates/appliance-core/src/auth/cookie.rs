//! Session cookie handed out on a Basic auth login.

use reqwest::header::{HeaderMap, HeaderName, AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Method, StatusCode};

use super::{AuthStrategy, CredentialPolicy, DEFAULT_METHODS};
use crate::error::Result;
use crate::request::ApiRequest;
use crate::types::{Appliance, Credentials};

/// Basic auth login whose `Set-Cookie` headers are replayed as `Cookie`.
#[derive(Debug, Clone)]
pub struct CookieAuth {
    appliance: Appliance,
    login_path: String,
    logout_path: Option<String>,
    cookie_header: HeaderName,
    success_status: StatusCode,
    methods: Vec<Method>,
    policy: CredentialPolicy,
}

impl CookieAuth {
    /// Create a strategy for `appliance` logging in at `login_path`.
    ///
    /// Defaults: success status 200, no logout endpoint.
    #[must_use]
    pub fn new(appliance: Appliance, login_path: impl Into<String>) -> Self {
        Self {
            appliance,
            login_path: login_path.into(),
            logout_path: None,
            cookie_header: COOKIE,
            success_status: StatusCode::OK,
            methods: DEFAULT_METHODS.to_vec(),
            policy: CredentialPolicy::Required,
        }
    }

    /// Set a logout path (sent as a `POST`).
    #[must_use]
    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = Some(path.into());
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

impl AuthStrategy for CookieAuth {
    fn appliance(&self) -> Appliance {
        self.appliance
    }

    fn build_login_request(&self, credentials: &Credentials) -> Result<ApiRequest> {
        Ok(ApiRequest::new(Method::POST, self.login_path.as_str())
            .with_header(AUTHORIZATION, credentials.basic_auth_value()?))
    }

    fn success_status(&self) -> StatusCode {
        self.success_status
    }

    /// Joins the `name=value` part of every `Set-Cookie` header with `"; "`.
    fn extract_credential(&self, headers: &HeaderMap) -> Option<String> {
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect();

        if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("; "))
        }
    }

    fn credential_header(&self) -> &HeaderName {
        &self.cookie_header
    }

    fn credential_source(&self) -> &str {
        "set-cookie"
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
