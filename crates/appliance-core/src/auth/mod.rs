//! Authentication strategies.
//!
//! An [`AuthStrategy`] describes one appliance's handshake as data: how the login
//! request looks, which status means success, where the credential comes back and
//! where it must be replayed. The session engine drives the exchange; strategies
//! never perform I/O themselves.
//!
//! Three configurable variants cover the appliances in this workspace:
//!
//! - [`TokenHeaderAuth`] - username and password in request headers, token in a
//!   response header
//! - [`CookieAuth`] - Basic auth login, every `Set-Cookie` replayed as `Cookie`
//! - [`DualAuth`] - token header plus a Basic auth header on every call

mod cookie;
mod dual;
mod token;

pub use cookie::CookieAuth;
pub use dual::DualAuth;
pub use token::TokenHeaderAuth;

use reqwest::header::{HeaderMap, HeaderName};
use reqwest::{Method, StatusCode};

use crate::error::Result;
use crate::request::ApiRequest;
use crate::types::{Appliance, Credentials};

/// Methods accepted by most appliances.
pub const DEFAULT_METHODS: &[Method] = &[Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Methods accepted by appliances that also support partial updates.
pub const METHODS_WITH_PATCH: &[Method] = &[
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// What to do when a successful login response carries no credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPolicy {
    /// Fail the login with [`crate::Error::MissingCredential`]
    #[default]
    Required,
    /// Continue without a stored credential and log a warning
    Optional,
}

/// An appliance authentication handshake.
pub trait AuthStrategy: Send + Sync {
    /// Appliance this strategy talks to.
    fn appliance(&self) -> Appliance;

    /// Build the login request for the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be represented as header values.
    fn build_login_request(&self, credentials: &Credentials) -> Result<ApiRequest>;

    /// Status the login endpoint returns on success.
    fn success_status(&self) -> StatusCode;

    /// Pull the credential out of the login response headers.
    fn extract_credential(&self, headers: &HeaderMap) -> Option<String>;

    /// Header carrying the credential on every later call.
    fn credential_header(&self) -> &HeaderName;

    /// Name of the login response header the credential is read from.
    fn credential_source(&self) -> &str {
        self.credential_header().as_str()
    }

    /// Extra headers attached to every later call.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value cannot be built.
    fn static_headers(&self, _credentials: &Credentials) -> Result<HeaderMap> {
        Ok(HeaderMap::new())
    }

    /// Build the logout request, or `None` when the appliance has no logout endpoint.
    fn build_logout_request(&self, credential: Option<&str>) -> Option<ApiRequest>;

    /// HTTP methods this appliance accepts.
    fn allowed_methods(&self) -> &[Method];

    /// Behavior when the login response carries no credential.
    fn credential_policy(&self) -> CredentialPolicy {
        CredentialPolicy::Required
    }

    /// Returns true if `method` is in [`AuthStrategy::allowed_methods`].
    fn allows(&self, method: &Method) -> bool {
        self.allowed_methods().contains(method)
    }
}

/// Read a header as UTF-8 text, ignoring empty values.
pub(crate) fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
