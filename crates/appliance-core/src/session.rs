//! The session engine.
//!
//! A [`Session`] binds one [`AuthStrategy`] and one [`PayloadCodec`] to a base
//! URL and drives the whole lifecycle:
//!
//! 1. `connect` builds the HTTP client and logs in when credentials are configured
//! 2. every call gets the codec's default headers, the caller's overrides and then
//!    the authentication headers, in that order
//! 3. `logout` tells the appliance the session is over and forgets the credential
//!
//! HTTP statuses never raise on ordinary calls. A status outside 200, 201, 202 and
//! 204 is logged and returned as [`ApiResponse::Rejected`]; use
//! [`ApiResponse::into_result`] for a strict reading.
//!
//! # Example
//!
//! ```no_run
//! use appliance_core::{scoped, JsonCodec, Session, SessionConfig, TokenHeaderAuth, Appliance};
//!
//! # async fn run() -> appliance_core::Result<()> {
//! let config = SessionConfig::new("https://fxos.example.com")?
//!     .with_credentials("admin", "secret".to_string());
//! let auth = TokenHeaderAuth::new(Appliance::Fxos, "/api/login").with_logout_path("/api/logout");
//! let session = Session::connect(&config, auth, JsonCodec::new()).await?;
//!
//! let version = scoped(session, |s| {
//!     Box::pin(async move { s.get("/api/sys/firmware/version/mgmt").await })
//! })
//! .await?;
//! # let _ = version;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, info_span, trace, warn, Instrument, Span};
use url::Url;

use crate::auth::{AuthStrategy, CredentialPolicy};
use crate::client::{body_preview, build_http_client, HttpConfig};
use crate::codec::PayloadCodec;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::request::{is_accepted, is_bodyless, ApiRequest, ApiResponse, RequestOptions};
use crate::types::{Appliance, Credentials};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No login has succeeded yet
    Anonymous,
    /// Login succeeded; authentication headers are attached to every call
    Authenticated,
    /// The last login failed; calls fail with [`Error::LoginRequired`] until a
    /// login succeeds
    LoginFailed,
    /// Logged out; every further call fails with [`Error::SessionClosed`]
    LoggedOut,
}

struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// Authenticated connection to one appliance.
///
/// The session is not `Clone` and is meant to be driven by one task at a time;
/// calls take `&self` so a page stream can borrow the session while it runs.
pub struct Session<A: AuthStrategy, C: PayloadCodec> {
    http: Client,
    base_url: Url,
    auth: A,
    codec: C,
    credentials: Option<Credentials>,
    credential: Option<SecretString>,
    static_headers: HeaderMap,
    state: SessionState,
    http_config: HttpConfig,
    span: Span,
}

impl<A: AuthStrategy, C: PayloadCodec> std::fmt::Debug for Session<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("appliance", &self.auth.appliance())
            .field("base_url", &self.base_url.as_str())
            .field("state", &self.state)
            .field("has_credential", &self.credential.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`] with non-default transport settings.
#[derive(Debug)]
pub struct SessionBuilder<'c, A, C> {
    config: &'c SessionConfig,
    auth: A,
    codec: C,
    http_config: HttpConfig,
}

impl<'c, A: AuthStrategy, C: PayloadCodec> SessionBuilder<'c, A, C> {
    /// Set HTTP transport settings.
    #[must_use]
    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Build the session and log in if credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an absent or invalid base URL and any
    /// authentication error raised by the login.
    pub async fn connect(self) -> Result<Session<A, C>> {
        let base_url = self.config.parse_base_url()?;
        let http = build_http_client(self.config, &self.http_config)?;
        let span = info_span!(
            "session",
            appliance = %self.auth.appliance(),
            base_url = %base_url
        );

        let mut session = Session {
            http,
            base_url,
            auth: self.auth,
            codec: self.codec,
            credentials: self.config.credentials(),
            credential: None,
            static_headers: HeaderMap::new(),
            state: SessionState::Anonymous,
            http_config: self.http_config,
            span,
        };

        if session.credentials.is_some() {
            session.login().await?;
        } else {
            session
                .span
                .in_scope(|| debug!("no credentials configured, session stays anonymous"));
        }

        Ok(session)
    }
}

impl<A: AuthStrategy, C: PayloadCodec> Session<A, C> {
    /// Start building a session with custom transport settings.
    pub fn builder(config: &SessionConfig, auth: A, codec: C) -> SessionBuilder<'_, A, C> {
        SessionBuilder {
            config,
            auth,
            codec,
            http_config: HttpConfig::default(),
        }
    }

    /// Open a session with default transport settings.
    ///
    /// # Errors
    ///
    /// See [`SessionBuilder::connect`].
    pub async fn connect(config: &SessionConfig, auth: A, codec: C) -> Result<Self> {
        Self::builder(config, auth, codec).connect().await
    }

    /// Appliance this session talks to.
    pub fn appliance(&self) -> Appliance {
        self.auth.appliance()
    }

    /// Base URL of the management API.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true once a login succeeded and no logout happened since.
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Returns true while a credential is stored.
    pub const fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Bound authentication strategy.
    pub const fn auth(&self) -> &A {
        &self.auth
    }

    /// Bound payload codec.
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    /// Log in with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] when no credentials are configured or
    /// the login cannot be sent, [`Error::LoginRejected`] on an unexpected status and
    /// [`Error::MissingCredential`] when the response carries no credential and the
    /// strategy requires one.
    pub async fn login(&mut self) -> Result<()> {
        let credentials = self.credentials.clone().ok_or_else(|| {
            Error::AuthenticationFailed("no login credentials configured".to_string())
        })?;
        self.login_with(credentials).await
    }

    /// Log in with the given credentials, replacing any configured ones.
    ///
    /// # Errors
    ///
    /// See [`Session::login`]. On failure any previous credential is dropped and
    /// the session refuses calls until a later login succeeds.
    pub async fn login_with(&mut self, credentials: Credentials) -> Result<()> {
        let span = self.span.clone();
        let result = self.authenticate(credentials).instrument(span).await;
        if result.is_err() {
            self.credential = None;
            self.static_headers.clear();
            self.state = SessionState::LoginFailed;
        }
        result
    }

    async fn authenticate(&mut self, credentials: Credentials) -> Result<()> {
        let request = self.auth.build_login_request(&credentials)?;
        debug!(method = %request.method, path = %request.path, user = credentials.username(), "logging in");

        let response = self
            .execute(request, None)
            .await
            .map_err(|err| Error::AuthenticationFailed(err.to_string()))?;

        if response.status != self.auth.success_status() {
            let message = body_preview(&response.body, self.http_config.log_body_limit);
            error!(
                status = response.status.as_u16(),
                expected = self.auth.success_status().as_u16(),
                "login rejected"
            );
            return Err(Error::LoginRejected {
                status: response.status.as_u16(),
                message,
            });
        }

        match self.auth.extract_credential(&response.headers) {
            Some(credential) => self.credential = Some(SecretString::from(credential)),
            None => match self.auth.credential_policy() {
                CredentialPolicy::Required => {
                    error!(header = self.auth.credential_source(), "login response carried no credential");
                    return Err(Error::MissingCredential(
                        self.auth.credential_source().to_string(),
                    ));
                }
                CredentialPolicy::Optional => {
                    warn!(header = self.auth.credential_source(), "login response carried no credential, continuing without one");
                    self.credential = None;
                }
            },
        }

        self.static_headers = self.auth.static_headers(&credentials)?;
        self.credentials = Some(credentials);
        self.state = SessionState::Authenticated;
        info!("login successful");
        Ok(())
    }

    /// Log out. Best effort: failures are logged, never returned.
    ///
    /// The logout request is only sent when the session is authenticated and the
    /// strategy defines one. The credential is always forgotten and the session is
    /// closed afterwards.
    pub async fn logout(&mut self) {
        let span = self.span.clone();
        self.close().instrument(span).await;
    }

    async fn close(&mut self) {
        if self.state == SessionState::Authenticated {
            let credential = self
                .credential
                .as_ref()
                .map(|secret| secret.expose_secret().to_string());

            match self.auth.build_logout_request(credential.as_deref()) {
                Some(mut request) => {
                    debug!(method = %request.method, path = %request.path, "logging out");
                    match self.attach_auth(&mut request.headers) {
                        Ok(()) => match self.execute(request, None).await {
                            Ok(response) if is_accepted(response.status) => {}
                            Ok(response) => {
                                warn!(status = response.status.as_u16(), "logout returned unexpected status");
                            }
                            Err(err) => warn!(error = %err, "logout request failed"),
                        },
                        Err(err) => warn!(error = %err, "could not build logout headers"),
                    }
                }
                None => debug!("appliance has no logout endpoint"),
            }
        } else {
            debug!(state = ?self.state, "not authenticated, skipping logout request");
        }

        self.credential = None;
        self.static_headers.clear();
        self.state = SessionState::LoggedOut;
        info!("logout successful");
    }

    /// End a scoped use of the session.
    ///
    /// Authentication and request errors are only logged, since the appliance
    /// state is unknown after them; any other outcome triggers a logout.
    pub async fn exit(&mut self, error: Option<&Error>) {
        match error {
            Some(err) if err.poisons_session() => {
                self.span.in_scope(|| {
                    error!(code = err.error_code(), error = %err, "session aborted");
                });
            }
            _ => self.logout().await,
        }
    }

    /// Issue a call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotAllowed`] before any I/O when the appliance does not
    /// accept `method`, [`Error::SessionClosed`] after logout,
    /// [`Error::LoginRequired`] after a failed login,
    /// [`Error::BodyNotAllowed`] for `GET`/`DELETE` with a body, transport errors and
    /// [`Error::DecodeError`] for malformed bodies. Unacceptable statuses are not
    /// errors.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&C::Value>,
        options: &RequestOptions,
    ) -> Result<ApiResponse<C::Value>> {
        if !self.auth.allows(&method) {
            return Err(Error::MethodNotAllowed {
                method: method.to_string(),
                appliance: self.auth.appliance().to_string(),
            });
        }
        match self.state {
            SessionState::LoggedOut => return Err(Error::SessionClosed),
            SessionState::LoginFailed => return Err(Error::LoginRequired),
            SessionState::Anonymous | SessionState::Authenticated => {}
        }

        let headers = self.outgoing_headers(options)?;

        if body.is_some() && is_bodyless(&method) {
            return Err(Error::BodyNotAllowed(method.to_string()));
        }

        let mut request = ApiRequest::new(method, path).with_query(options.query.clone());
        request.headers = headers;
        request.body = body.map(|value| self.codec.encode(value)).transpose()?;

        self.dispatch(request, options.timeout)
            .instrument(self.span.clone())
            .await
    }

    /// `GET` with default options.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn get(&self, path: &str) -> Result<ApiResponse<C::Value>> {
        self.request(Method::GET, path, None, &RequestOptions::default())
            .await
    }

    /// `POST` with default options.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn post(&self, path: &str, body: &C::Value) -> Result<ApiResponse<C::Value>> {
        self.request(Method::POST, path, Some(body), &RequestOptions::default())
            .await
    }

    /// `PUT` with default options.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn put(&self, path: &str, body: &C::Value) -> Result<ApiResponse<C::Value>> {
        self.request(Method::PUT, path, Some(body), &RequestOptions::default())
            .await
    }

    /// `PATCH` with default options.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn patch(&self, path: &str, body: &C::Value) -> Result<ApiResponse<C::Value>> {
        self.request(Method::PATCH, path, Some(body), &RequestOptions::default())
            .await
    }

    /// `DELETE` with default options.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn delete(&self, path: &str) -> Result<ApiResponse<C::Value>> {
        self.request(Method::DELETE, path, None, &RequestOptions::default())
            .await
    }

    fn outgoing_headers(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = self.codec.default_headers()?;
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }
        self.attach_auth(&mut headers)?;
        Ok(headers)
    }

    // Authentication headers go last so callers cannot override them.
    fn attach_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        if let Some(credential) = &self.credential {
            let mut value = HeaderValue::from_str(credential.expose_secret())?;
            value.set_sensitive(true);
            headers.insert(self.auth.credential_header().clone(), value);
        }
        for (name, value) in &self.static_headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        request: ApiRequest,
        timeout: Option<Duration>,
    ) -> Result<ApiResponse<C::Value>> {
        let method = request.method.clone();
        let path = request.path.clone();
        let limit = self.http_config.log_body_limit;

        debug!(%method, %path, "sending request");
        if let Some(body) = &request.body {
            trace!(body = %body_preview(body, limit), "request body");
        }

        let response = self.execute(request, timeout).await?;
        let status = response.status;

        if !is_accepted(status) {
            let body = body_preview(&response.body, limit);
            error!(%method, %path, status = status.as_u16(), body = %body, "unexpected HTTP status");
            return Ok(ApiResponse::Rejected { status, body });
        }

        debug!(
            status = status.as_u16(),
            body = %body_preview(&response.body, limit),
            "response received"
        );

        Ok(match self.codec.decode(&response.body)? {
            Some(value) => ApiResponse::Decoded { status, value },
            None => ApiResponse::Empty { status },
        })
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    async fn execute(&self, request: ApiRequest, timeout: Option<Duration>) -> Result<RawResponse> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.http.request(request.method, url).headers(request.headers);

        if !request.query.is_empty() {
            builder = builder.query(request.query.pairs());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Anything that owns a [`Session`]: the session itself and every appliance façade.
pub trait ApplianceClient: Send {
    /// Authentication strategy of the underlying session.
    type Auth: AuthStrategy;
    /// Payload codec of the underlying session.
    type Codec: PayloadCodec;

    /// Borrow the session.
    fn session(&self) -> &Session<Self::Auth, Self::Codec>;

    /// Borrow the session mutably.
    fn session_mut(&mut self) -> &mut Session<Self::Auth, Self::Codec>;
}

impl<A: AuthStrategy, C: PayloadCodec> ApplianceClient for Session<A, C> {
    type Auth = A;
    type Codec = C;

    fn session(&self) -> &Self {
        self
    }

    fn session_mut(&mut self) -> &mut Self {
        self
    }
}

/// Run `f` against `holder`, then end the session.
///
/// The session is logged out afterwards unless `f` failed with an authentication
/// or request error (see [`Session::exit`]). The result of `f` is returned
/// unchanged.
///
/// # Errors
///
/// Returns whatever `f` returns.
pub async fn scoped<H, T, F>(mut holder: H, f: F) -> Result<T>
where
    H: ApplianceClient,
    F: for<'h> FnOnce(&'h mut H) -> BoxFuture<'h, Result<T>>,
{
    let result = f(&mut holder).await;
    holder.session_mut().exit(result.as_ref().err()).await;
    result
}
