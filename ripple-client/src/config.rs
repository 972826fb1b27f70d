use std::time::Duration;

use crate::api::{ApiClient, ApiResult, ReqwestTransport};

const DEFAULT_API_URL: &str = "https://api.ripple-social.app/v1";
const DEFAULT_SOCKET_URL: &str = "wss://api.ripple-social.app/v1/socket";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration, resolved from the environment with production
/// defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub socket_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the environment (reading a `.env` file
    /// if present), falling back to production defaults.
    ///
    /// Recognized variables: `RIPPLE_API_URL`, `RIPPLE_SOCKET_URL`,
    /// `RIPPLE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let timeout = std::env::var("RIPPLE_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            base_url: std::env::var("RIPPLE_API_URL").unwrap_or(defaults.base_url),
            socket_url: std::env::var("RIPPLE_SOCKET_URL").unwrap_or(defaults.socket_url),
            request_timeout: timeout,
        }
    }

    /// Builds an [`ApiClient`] with the production reqwest transport.
    pub fn build_client(&self) -> ApiResult<ApiClient> {
        let transport = ReqwestTransport::new(self.request_timeout)?;
        Ok(ApiClient::new(self.base_url.clone(), transport))
    }
}
