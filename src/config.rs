//! Configuration Management
//!
//! Holds the API endpoint, the bearer token and request policies. Reads the
//! standard `VILOCIFY_API_*` environment variables or is built programmatically.

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Environment variable holding the API bearer token.
pub const ENV_TOKEN: &str = "VILOCIFY_API_TOKEN";
/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "VILOCIFY_API_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://portal.vilocify.com/api/v2";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// What `update()` does when no attribute or relationship is dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyUpdate {
    /// Issue the PATCH with an empty delta (the server bumps `updatedAt`).
    #[default]
    Send,
    /// Return success without any network call.
    Skip,
}

/// Connection settings for one [`Api`](crate::Api) session.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the APIv2 endpoint, without a trailing slash.
    pub base_url: String,
    /// Bearer token, as issued in the portal's profile settings.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Policy for updates with nothing to send.
    pub empty_update: EmptyUpdate,
}

impl ApiConfig {
    /// Create a configuration for the production endpoint with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            empty_update: EmptyUpdate::default(),
        }
    }

    /// Build a configuration from `VILOCIFY_API_TOKEN` and `VILOCIFY_API_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| Error::Config(format!("{ENV_TOKEN} is not set")))?;
        let mut config = Self::new(token);
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Override the base URL (e.g. a staging endpoint).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the empty-update policy.
    pub fn with_empty_update(mut self, policy: EmptyUpdate) -> Self {
        self.empty_update = policy;
        self
    }

    /// Base URL with the path stripped, used to resolve pagination links.
    pub fn api_host(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "unsupported base URL scheme {other:?}, expected http or https"
                )))
            }
        }
        url.set_path("");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// URL of a collection or resource endpoint under the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token never appears in logs
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .field("timeout", &self.timeout)
            .field("empty_update", &self.empty_update)
            .finish()
    }
}
