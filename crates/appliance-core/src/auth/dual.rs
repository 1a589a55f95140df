//! Token header combined with a Basic auth header on every call.

use reqwest::header::{HeaderMap, HeaderName, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use url::Url;

use super::{header_text, AuthStrategy, CredentialPolicy, METHODS_WITH_PATCH};
use crate::error::Result;
use crate::request::ApiRequest;
use crate::types::{Appliance, Credentials};

/// Placeholder replaced by the token in logout path templates.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");

/// Percent-encode `raw` as a single URL path segment.
fn path_segment(raw: &str) -> Option<String> {
    let mut url = Url::parse("http://segment.invalid/").ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(raw);
    url.path().strip_prefix('/').map(ToString::to_string)
}

/// Basic auth login returning a token header, with Basic auth kept on later calls.
///
/// Some appliances report the wrong user or privilege level when only the token
/// is presented, so the `Authorization` header is attached as a static header for
/// the whole session.
#[derive(Debug, Clone)]
pub struct DualAuth {
    appliance: Appliance,
    login_path: String,
    login_body: Option<Vec<u8>>,
    logout_template: Option<String>,
    token_header: HeaderName,
    success_status: StatusCode,
    methods: Vec<Method>,
    policy: CredentialPolicy,
}

impl DualAuth {
    /// Create a strategy for `appliance` logging in at `login_path`.
    ///
    /// Defaults: login body `{}`, `X-Auth-Token` header, success status 204,
    /// methods including `PATCH`, no logout endpoint.
    #[must_use]
    pub fn new(appliance: Appliance, login_path: impl Into<String>) -> Self {
        Self {
            appliance,
            login_path: login_path.into(),
            login_body: Some(b"{}".to_vec()),
            logout_template: None,
            token_header: X_AUTH_TOKEN,
            success_status: StatusCode::NO_CONTENT,
            methods: METHODS_WITH_PATCH.to_vec(),
            policy: CredentialPolicy::Required,
        }
    }

    /// Set the logout path template (sent as a `DELETE`); `{token}` is substituted.
    #[must_use]
    pub fn with_logout_template(mut self, template: impl Into<String>) -> Self {
        self.logout_template = Some(template.into());
        self
    }

    /// Set the raw login body.
    #[must_use]
    pub fn with_login_body(mut self, body: Option<Vec<u8>>) -> Self {
        self.login_body = body;
        self
    }

    /// Set the header carrying the token in both directions.
    #[must_use]
    pub fn with_token_header(mut self, header: HeaderName) -> Self {
        self.token_header = header;
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

impl AuthStrategy for DualAuth {
    fn appliance(&self) -> Appliance {
        self.appliance
    }

    fn build_login_request(&self, credentials: &Credentials) -> Result<ApiRequest> {
        let mut request = ApiRequest::new(Method::POST, self.login_path.as_str())
            .with_header(AUTHORIZATION, credentials.basic_auth_value()?);
        request.body.clone_from(&self.login_body);
        Ok(request)
    }

    fn success_status(&self) -> StatusCode {
        self.success_status
    }

    fn extract_credential(&self, headers: &HeaderMap) -> Option<String> {
        header_text(headers, &self.token_header)
    }

    fn credential_header(&self) -> &HeaderName {
        &self.token_header
    }

    fn static_headers(&self, credentials: &Credentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, credentials.basic_auth_value()?);
        Ok(headers)
    }

    fn build_logout_request(&self, credential: Option<&str>) -> Option<ApiRequest> {
        let template = self.logout_template.as_deref()?;
        // a template that needs the token is useless without one
        if template.contains(TOKEN_PLACEHOLDER) {
            let token = path_segment(credential?)?;
            return Some(ApiRequest::new(
                Method::DELETE,
                template.replace(TOKEN_PLACEHOLDER, &token),
            ));
        }
        Some(ApiRequest::new(Method::DELETE, template))
    }

    fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    fn credential_policy(&self) -> CredentialPolicy {
        self.policy
    }
}
