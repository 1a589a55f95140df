//! FXOS session and operations.

use appliance_core::{
    Appliance, ApplianceClient, HttpConfig, JsonCodec, Session, SessionConfig, TokenHeaderAuth,
};
use tracing::{info, warn};

use crate::models::{FirmwareReport, FirmwareVersion};
use crate::Result;

const USER_AGENT: &str = concat!("appliance-fxos/", env!("CARGO_PKG_VERSION"));

/// Login endpoint
pub const LOGIN_PATH: &str = "/api/login";
/// Logout endpoint
pub const LOGOUT_PATH: &str = "/api/logout";
/// Management firmware version endpoint
pub const FIRMWARE_VERSION_PATH: &str = "/api/sys/firmware/version/mgmt";

/// Session type used by [`Fxos`].
pub type FxosSession = Session<TokenHeaderAuth, JsonCodec>;

/// FXOS authentication: `USERNAME`/`PASSWORD` headers on login, `token` in the
/// response replayed as `TOKEN`.
#[must_use]
pub fn fxos_auth() -> TokenHeaderAuth {
    TokenHeaderAuth::new(Appliance::Fxos, LOGIN_PATH).with_logout_path(LOGOUT_PATH)
}

/// Client for the FXOS chassis manager.
#[derive(Debug)]
pub struct Fxos {
    session: FxosSession,
}

impl Fxos {
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
        let session = Session::builder(config, fxos_auth(), JsonCodec::new())
            .with_http_config(http_config)
            .connect()
            .await?;
        Ok(Self { session })
    }

    /// Wrap an existing session.
    #[must_use]
    pub const fn from_session(session: FxosSession) -> Self {
        Self { session }
    }

    /// Return the underlying session.
    #[must_use]
    pub fn into_session(self) -> FxosSession {
        self.session
    }

    /// Running management firmware, `None` when the chassis reports none.
    ///
    /// # Errors
    ///
    /// Returns request errors, [`appliance_core::Error::UnexpectedStatus`] for an
    /// unacceptable status and [`appliance_core::Error::DecodeError`] for a body that
    /// does not match [`FirmwareReport`].
    pub async fn firmware_version(&self) -> Result<Option<FirmwareVersion>> {
        let Some(body) = self.session.get(FIRMWARE_VERSION_PATH).await?.into_result()? else {
            warn!("firmware version request returned no data");
            return Ok(None);
        };

        let report: FirmwareReport = serde_json::from_value(body)?;
        let running = report.running();
        if let Some(firmware) = &running {
            info!(
                base_url = %self.session.base_url(),
                package_version = %firmware.package_version,
                "FXOS software version"
            );
        }
        Ok(running)
    }

    /// Log out of the chassis manager.
    pub async fn logout(&mut self) {
        self.session.logout().await;
    }
}

impl ApplianceClient for Fxos {
    type Auth = TokenHeaderAuth;
    type Codec = JsonCodec;

    fn session(&self) -> &FxosSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut FxosSession {
        &mut self.session
    }
}
