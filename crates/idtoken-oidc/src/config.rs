//! Key service configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`crate::OidcKeyService`]
///
/// Durations are whole seconds so the struct deserializes from flat config
/// files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Per-request timeout for discovery and JWKS fetches
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long a discovery document is reused
    #[serde(default = "default_metadata_cache_ttl_secs")]
    pub metadata_cache_ttl_secs: u64,

    /// How long a JWKS is reused before it is fetched again
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,

    /// Minimum gap between forced JWKS refreshes (unknown `kid`)
    #[serde(default = "default_min_refresh_interval_secs")]
    pub min_refresh_interval_secs: u64,

    /// Largest discovery or JWKS response accepted
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// User agent for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Allow plain `http` for localhost and loopback addresses
    #[serde(default = "default_allow_insecure_loopback")]
    pub allow_insecure_loopback: bool,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_metadata_cache_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_jwks_cache_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_min_refresh_interval_secs() -> u64 {
    5
}

fn default_max_response_bytes() -> usize {
    64 * 1024
}

fn default_user_agent() -> String {
    format!("idtoken-oidc/{}", env!("CARGO_PKG_VERSION"))
}

fn default_allow_insecure_loopback() -> bool {
    true
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            metadata_cache_ttl_secs: default_metadata_cache_ttl_secs(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl_secs(),
            min_refresh_interval_secs: default_min_refresh_interval_secs(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
            allow_insecure_loopback: default_allow_insecure_loopback(),
        }
    }
}

impl OidcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn metadata_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_cache_ttl_secs)
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval_secs)
    }

    /// Only accept `https` endpoints, even on loopback
    pub fn require_https(mut self) -> Self {
        self.allow_insecure_loopback = false;
        self
    }
}
