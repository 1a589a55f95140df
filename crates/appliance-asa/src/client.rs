//! ASA session and operations.

use std::time::Duration;

use appliance_core::{
    Appliance, ApplianceClient, DualAuth, Error, HttpConfig, JsonCodec, RequestOptions, Session,
    SessionConfig,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::models::{CliOutput, CliRequest, CliResponse};
use crate::Result;

const USER_AGENT: &str = concat!("appliance-asa/", env!("CARGO_PKG_VERSION"));

/// Token service endpoint
pub const TOKEN_SERVICES_PATH: &str = "/api/tokenservices";
/// Token deletion endpoint template
pub const TOKEN_LOGOUT_TEMPLATE: &str = "/api/tokenservices/{token}";
/// CLI passthrough endpoint
pub const CLI_PATH: &str = "/api/cli";
/// Command used by [`Asa::version`]
pub const VERSION_COMMAND: &str = "show version | in Version";

/// Session type used by [`Asa`].
pub type AsaSession = Session<DualAuth, JsonCodec>;

/// ASA authentication: Basic auth login answered with 204 and an `X-Auth-Token`;
/// Basic auth stays on every call; logout deletes the token.
#[must_use]
pub fn asa_auth() -> DualAuth {
    DualAuth::new(Appliance::Asa, TOKEN_SERVICES_PATH).with_logout_template(TOKEN_LOGOUT_TEMPLATE)
}

/// Client for the ASA REST agent.
#[derive(Debug)]
pub struct Asa {
    session: AsaSession,
    cli_timeout: Duration,
}

impl Asa {
    /// Connect and log in when credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns configuration and authentication errors from the session.
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        Self::connect_with(config, HttpConfig::new().with_user_agent(USER_AGENT)).await
    }

    /// Connect with custom transport settings.
    ///
    /// # Errors
    ///
    /// Returns configuration and authentication errors from the session.
    pub async fn connect_with(config: &SessionConfig, http_config: HttpConfig) -> Result<Self> {
        let session = Session::builder(config, asa_auth(), JsonCodec::new())
            .with_http_config(http_config)
            .connect()
            .await?;
        Ok(Self::from_session(session))
    }

    /// Wrap an existing session.
    #[must_use]
    pub fn from_session(session: AsaSession) -> Self {
        Self {
            session,
            cli_timeout: Appliance::Asa.default_timeout(),
        }
    }

    /// Set the timeout applied to CLI passthrough calls.
    #[must_use]
    pub const fn with_cli_timeout(mut self, timeout: Duration) -> Self {
        self.cli_timeout = timeout;
        self
    }

    /// Return the underlying session.
    #[must_use]
    pub fn into_session(self) -> AsaSession {
        self.session
    }

    /// Run CLI commands and pair each with its output.
    ///
    /// An empty reply yields no pairs.
    ///
    /// # Errors
    ///
    /// Returns request errors, [`Error::UnexpectedStatus`] for an unacceptable status
    /// and [`Error::DecodeError`] for a reply without the expected shape.
    pub async fn run_cli<S: AsRef<str>>(&self, commands: &[S]) -> Result<Vec<CliOutput>> {
        let request = CliRequest::new(commands.iter().map(|command| command.as_ref()));
        let body =
            serde_json::to_value(&request).map_err(|e| Error::EncodeError(e.to_string()))?;
        let options = RequestOptions::new().with_timeout(self.cli_timeout);

        let Some(reply) = self
            .session
            .request(Method::POST, CLI_PATH, Some(&body), &options)
            .await?
            .into_result()?
        else {
            debug!(commands = request.commands.len(), "CLI call returned no data");
            return Ok(Vec::new());
        };

        let response: CliResponse = serde_json::from_value(reply)?;
        let outputs = response.pair_with(request);
        for output in &outputs {
            debug!(command = %output.command, output = %output.output, "CLI output");
        }
        Ok(outputs)
    }

    /// Software version line reported by `show version`.
    ///
    /// # Errors
    ///
    /// See [`Asa::run_cli`].
    pub async fn version(&self) -> Result<Option<String>> {
        let version = self
            .run_cli(&[VERSION_COMMAND])
            .await?
            .into_iter()
            .next()
            .map(|output| output.output);

        if let Some(version) = &version {
            info!(version = %version.trim(), "ASA version");
        }
        Ok(version)
    }

    /// Log out and delete the token.
    pub async fn logout(&mut self) {
        self.session.logout().await;
    }
}

impl ApplianceClient for Asa {
    type Auth = DualAuth;
    type Codec = JsonCodec;

    fn session(&self) -> &AsaSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut AsaSession {
        &mut self.session
    }
}
