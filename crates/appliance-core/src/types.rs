//! Core appliance types.
//!
//! This module names the supported appliance families and carries the login
//! credentials used by authentication strategies.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::Engine as _;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::client::{ASA_DEFAULT_TIMEOUT, FXOS_DEFAULT_TIMEOUT, ISE_DEFAULT_TIMEOUT};
use crate::error::{Error, Result};

/// Default HTTPS port
pub const DEFAULT_HTTPS_PORT: u16 = 443;
/// Default port of the identity server's external RESTful services
pub const ISE_ERS_PORT: u16 = 9060;

/// Supported appliance families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appliance {
    /// Firepower eXtensible Operating System chassis manager
    Fxos,
    /// Adaptive Security Appliance REST agent
    Asa,
    /// Identity Services Engine ERS API
    Ise,
}

impl Appliance {
    /// Returns the appliance name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fxos => "fxos",
            Self::Asa => "asa",
            Self::Ise => "ise",
        }
    }

    /// Returns all supported appliances.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Fxos, Self::Asa, Self::Ise]
    }

    /// Returns the port the management API listens on by default.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Fxos | Self::Asa => DEFAULT_HTTPS_PORT,
            Self::Ise => ISE_ERS_PORT,
        }
    }

    /// Returns the default request timeout for this appliance.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        match self {
            Self::Fxos => Duration::from_secs(FXOS_DEFAULT_TIMEOUT),
            Self::Asa => Duration::from_secs(ASA_DEFAULT_TIMEOUT),
            Self::Ise => Duration::from_secs(ISE_DEFAULT_TIMEOUT),
        }
    }
}

impl fmt::Display for Appliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Appliance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|appliance| appliance.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::ConfigError(format!("Unknown appliance: {s}")))
    }
}

/// Username and password used to log in.
///
/// The password is kept in a [`SecretString`] so it never shows up in `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials from a username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build credentials only when both parts are present and non-empty.
    #[must_use]
    pub fn from_parts(username: Option<&str>, password: Option<&SecretString>) -> Option<Self> {
        match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.expose_secret().is_empty() => {
                Some(Self::new(user, pass.clone()))
            }
            _ => None,
        }
    }

    /// Login username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    /// Build a `Basic` authorization header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoded value is not a valid header value.
    pub fn basic_auth_value(&self) -> Result<HeaderValue> {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}
