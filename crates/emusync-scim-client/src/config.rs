//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use emusync_connector::error::{ConnectorError, ConnectorResult};
use emusync_connector::secret::SecretString;

/// Configuration for an [`crate::EnterpriseClient`].
///
/// The token is not part of the serialized form; it is injected after
/// deserialization with [`ClientConfig::with_token`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the provider API (e.g. `https://api.example.com`).
    pub base_url: String,

    /// Enterprise slug addressed by every resource path.
    pub enterprise_slug: String,

    /// Bearer token for the session.
    #[serde(skip)]
    pub token: SecretString,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Page size used when a search does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Value sent in the provider API version header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    50
}

fn default_api_version() -> String {
    "2022-11-28".to_string()
}

impl ClientConfig {
    /// Create a configuration with default timeouts.
    pub fn new(
        base_url: impl Into<String>,
        enterprise_slug: impl Into<String>,
        token: impl Into<SecretString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            enterprise_slug: enterprise_slug.into(),
            token: token.into(),
            connection_timeout_secs: default_connection_timeout(),
            read_timeout_secs: default_read_timeout(),
            tls_verify: default_true(),
            default_page_size: default_page_size(),
            api_version: default_api_version(),
        }
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.token = token.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Disable TLS certificate verification (test targets only).
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set the default page size.
    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Get the connection timeout as a duration.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the read timeout as a duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::invalid_configuration(format!(
                "base URL '{}' is invalid: {e}",
                self.base_url
            ))
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConnectorError::invalid_configuration(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if self.enterprise_slug.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "enterprise slug must not be empty",
            ));
        }
        if self.token.is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "bearer token must not be empty",
            ));
        }
        Ok(())
    }

    /// Root of the SCIM resource tree for the configured enterprise.
    pub fn scim_base(&self) -> String {
        format!(
            "{}/scim/v2/enterprises/{}",
            self.base_url.trim_end_matches('/'),
            self.enterprise_slug
        )
    }

    /// URL of the seat listing for the configured enterprise.
    pub fn seats_url(&self) -> String {
        format!(
            "{}/enterprises/{}/copilot/billing/seats",
            self.base_url.trim_end_matches('/'),
            self.enterprise_slug
        )
    }
}
