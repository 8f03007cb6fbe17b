//! OpenID Connect discovery
//!
//! Resolves `{issuer}/.well-known/openid-configuration` and checks that the
//! document belongs to the configured issuer before its `jwks_uri` is trusted.

use idtoken::ValidationContext;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::{Host, Url};

use crate::error::{OidcError, Result};

/// Path appended to the issuer to find its discovery document
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Subset of the OpenID Provider Metadata needed for signature checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,

    pub jwks_uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// Advertised ID token algorithms (informational only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Check the document against the configured issuer and return the
    /// parsed `jwks_uri`
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::IssuerMismatch`] if `issuer` differs (ignoring one
    /// trailing `/`), or an endpoint error if `jwks_uri` is unusable.
    pub fn validate(&self, expected_issuer: &str, allow_insecure_loopback: bool) -> Result<Url> {
        if self.issuer.trim_end_matches('/') != expected_issuer.trim_end_matches('/') {
            return Err(OidcError::IssuerMismatch {
                expected: expected_issuer.to_string(),
                actual: self.issuer.clone(),
            });
        }

        let jwks_uri = Url::parse(&self.jwks_uri).map_err(|e| OidcError::InvalidDocument {
            url: self.issuer.clone(),
            message: format!("invalid jwks_uri {:?}: {e}", self.jwks_uri),
        })?;
        ensure_secure(&jwks_uri, allow_insecure_loopback)?;
        Ok(jwks_uri)
    }
}

/// Parse and check a configured issuer URL
///
/// # Errors
///
/// Returns [`OidcError::InvalidIssuer`] for unparseable URLs or URLs with a
/// query or fragment, and [`OidcError::InsecureEndpoint`] for non-https ones.
pub fn parse_issuer(issuer: &str, allow_insecure_loopback: bool) -> Result<Url> {
    let url = Url::parse(issuer).map_err(|e| OidcError::InvalidIssuer {
        url: issuer.to_string(),
        reason: e.to_string(),
    })?;

    if url.query().is_some() || url.fragment().is_some() {
        return Err(OidcError::InvalidIssuer {
            url: issuer.to_string(),
            reason: "issuer must not carry a query or fragment".to_string(),
        });
    }

    ensure_secure(&url, allow_insecure_loopback)?;
    Ok(url)
}

/// Discovery document location for `issuer`
///
/// # Errors
///
/// Returns [`OidcError::InvalidIssuer`] if the joined URL does not parse.
pub fn discovery_url(issuer: &str) -> Result<Url> {
    let joined = format!("{}{DISCOVERY_PATH}", issuer.trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| OidcError::InvalidIssuer {
        url: issuer.to_string(),
        reason: e.to_string(),
    })
}

/// Require `https`, or `http` on a loopback host when allowed
///
/// # Errors
///
/// Returns [`OidcError::InsecureEndpoint`] otherwise.
pub fn ensure_secure(url: &Url, allow_insecure_loopback: bool) -> Result<()> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_insecure_loopback && is_loopback(url) => Ok(()),
        _ => Err(OidcError::InsecureEndpoint(url.to_string())),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// GET `url` and deserialize a bounded JSON body, honouring `ctx`
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    ctx: &ValidationContext,
    url: &Url,
    max_bytes: usize,
) -> Result<T> {
    debug!(
        url = %url,
        remaining_ms = ?ctx.remaining().map(|left| left.as_millis()),
        "Fetching JSON document"
    );

    let response = ctx
        .run(client.get(url.clone()).send())
        .await?
        .map_err(|e| {
            error!(url = %url, error = %e, "HTTP request failed");
            OidcError::request(url.as_str(), e)
        })?;

    let status = response.status();
    if !status.is_success() {
        error!(url = %url, status = %status, "Endpoint returned error status");
        return Err(OidcError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if let Some(length) = response.content_length()
        && length > max_bytes as u64
    {
        return Err(OidcError::ResponseTooLarge {
            url: url.to_string(),
            limit: max_bytes,
        });
    }

    let body = ctx
        .run(response.bytes())
        .await?
        .map_err(|e| OidcError::request(url.as_str(), e))?;
    if body.len() > max_bytes {
        return Err(OidcError::ResponseTooLarge {
            url: url.to_string(),
            limit: max_bytes,
        });
    }

    serde_json::from_slice(&body).map_err(|e| {
        error!(url = %url, error = %e, "Invalid JSON document");
        OidcError::invalid_document(url.as_str(), e)
    })
}
