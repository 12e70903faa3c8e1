use crate::build_constants::ActionPackage;
use crate::string_util::StringUtil;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// HTTP client creation for the hosting API.
///
/// Timeout and TLS behaviour are driven by environment variables so a
/// workflow can tune them without a new release.
pub struct HttpUtil;

impl HttpUtil {
    /// The environment variable name for configuring HTTP timeout in seconds.
    pub const HTTP_TIMEOUT_ENV: &'static str = "DEPLOY_ACTION_HTTP_TIMEOUT";
    /// The environment variable name for disabling TLS verification.
    pub const TLS_NO_VERIFY_ENV: &'static str = "DEPLOY_ACTION_TLS_NO_VERIFY";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 100;
    /// Minimum allowed timeout in seconds.
    pub const MIN_TIMEOUT_SECS: u64 = 10;
    /// Maximum allowed timeout in seconds.
    pub const MAX_TIMEOUT_SECS: u64 = 600;

    /// Parse a timeout value.
    ///
    /// Clamps the value to `[10, 600]` seconds. Defaults to 100s if unset or invalid.
    pub fn parse_timeout(raw: Option<&str>) -> Duration {
        let secs = raw
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs.clamp(Self::MIN_TIMEOUT_SECS, Self::MAX_TIMEOUT_SECS))
    }

    /// Read the configured timeout from the environment.
    pub fn get_timeout() -> Duration {
        let raw = std::env::var(Self::HTTP_TIMEOUT_ENV).ok();
        Self::parse_timeout(raw.as_deref())
    }

    /// Check whether TLS verification should be disabled.
    pub fn is_tls_no_verify() -> bool {
        let raw = std::env::var(Self::TLS_NO_VERIFY_ENV).unwrap_or_default();
        StringUtil::convert_to_bool(&raw) == Some(true)
    }

    /// Create a `reqwest::Client` with timeout, user agent and optional TLS
    /// verification bypass. Proxy settings come from the standard
    /// `HTTPS_PROXY` / `NO_PROXY` variables, which reqwest honours itself.
    pub fn create_http_client() -> Result<Client> {
        let timeout = Self::get_timeout();
        let tls_no_verify = Self::is_tls_no_verify();

        if tls_no_verify {
            tracing::warn!("TLS certificate verification is disabled");
        }

        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(tls_no_verify)
            .user_agent(ActionPackage::user_agent())
            .build()
            .context("Failed to build HTTP client")
    }
}
