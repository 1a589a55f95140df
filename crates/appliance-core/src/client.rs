//! HTTP client settings.
//!
//! This module holds the transport tuning shared by every session and builds the
//! underlying `reqwest` client. Sessions never retry: a transport failure or an
//! unacceptable status is reported to the caller exactly once.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

// Appliance-specific timeout configurations (in seconds)

/// Default timeout for FXOS requests
pub const FXOS_DEFAULT_TIMEOUT: u64 = 30;

/// Default timeout for ASA requests (CLI commands can be slow)
pub const ASA_DEFAULT_TIMEOUT: u64 = 60;

/// Default timeout for ISE requests
pub const ISE_DEFAULT_TIMEOUT: u64 = 30;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 4;

/// Default number of response body bytes shown in diagnostics
pub const DEFAULT_LOG_BODY_LIMIT: usize = 512;

const USER_AGENT: &str = concat!("appliance-core/", env!("CARGO_PKG_VERSION"));

/// HTTP transport configuration.
///
/// Timeouts that come from [`SessionConfig`] take precedence over the values here
/// when the client is built.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Enable response compression
    pub enable_compression: bool,

    /// Number of response body bytes included in log lines
    pub log_body_limit: usize,

    /// User agent sent with every request
    pub user_agent: String,
}

impl HttpConfig {
    /// Create a new HTTP configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
            log_body_limit: DEFAULT_LOG_BODY_LIMIT,
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Set how much of a response body is logged.
    #[must_use]
    pub const fn with_log_body_limit(mut self, limit: usize) -> Self {
        self.log_body_limit = limit;
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the `reqwest` client used by a session.
///
/// # Errors
///
/// Returns [`Error::ConfigError`] if the CA certificate cannot be loaded or the client
/// cannot be constructed.
pub fn build_http_client(config: &SessionConfig, http: &HttpConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .user_agent(http.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .pool_idle_timeout(http.pool_idle_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .gzip(http.enable_compression);

    if !config.tls_verify {
        warn!("TLS verification disabled for appliance session");
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(ca_cert) = &config.tls_ca_cert {
        debug!("loading CA certificate from {}", ca_cert.display());
        let bytes = std::fs::read(ca_cert).map_err(|err| {
            Error::ConfigError(format!(
                "Failed to read CA certificate {}: {err}",
                ca_cert.display()
            ))
        })?;
        let cert = reqwest::Certificate::from_pem(&bytes)
            .map_err(|err| Error::ConfigError(format!("Invalid CA certificate: {err}")))?;
        builder = builder.add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))
}

/// Truncate a response body for diagnostics without splitting a character.
#[must_use]
pub fn body_preview(body: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= limit {
        return text.into_owned();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_constants() {
        assert_eq!(FXOS_DEFAULT_TIMEOUT, 30);
        assert_eq!(ASA_DEFAULT_TIMEOUT, 60);
        assert_eq!(ISE_DEFAULT_TIMEOUT, 30);
    }

    #[test]
    fn test_http_config_new() {
        let config = HttpConfig::new();
        assert_eq!(
            config.pool_idle_timeout,
            Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT)
        );
        assert_eq!(config.pool_max_idle_per_host, DEFAULT_POOL_MAX_IDLE_PER_HOST);
        assert_eq!(config.log_body_limit, DEFAULT_LOG_BODY_LIMIT);
        assert!(config.enable_compression);
        assert!(config.user_agent.starts_with("appliance-core/"));
    }

    #[test]
    fn test_http_config_builder() {
        let config = HttpConfig::new()
            .with_pool_idle_timeout(Duration::from_secs(120))
            .with_pool_max_idle(20)
            .with_compression(false)
            .with_log_body_limit(64)
            .with_user_agent("lab-scripts/1.0");

        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
        assert_eq!(config.pool_max_idle_per_host, 20);
        assert!(!config.enable_compression);
        assert_eq!(config.log_body_limit, 64);
        assert_eq!(config.user_agent, "lab-scripts/1.0");
    }

    #[test]
    fn test_build_http_client() {
        let config = SessionConfig::new("https://fw.example.com").unwrap();
        assert!(build_http_client(&config, &HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_build_http_client_missing_ca() {
        let config = SessionConfig::new("https://fw.example.com")
            .unwrap()
            .with_ca_cert("/nonexistent/ca.pem".into());
        let err = build_http_client(&config, &HttpConfig::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_body_preview() {
        assert_eq!(body_preview(b"short", 10), "short");
        assert_eq!(body_preview(b"0123456789abc", 10), "0123456789...");
        // 'é' is two bytes; the cut must not land inside it
        assert_eq!(body_preview("aé".as_bytes(), 2), "a...");
    }
}
