//! OIDC-backed Issuer Key Service

use std::str::FromStr;
use std::time::Instant;

use async_trait::async_trait;
use idtoken::{Envelope, IssuerKeyService, KeyServiceError, ValidationContext};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OidcConfig;
use crate::discovery::{self, ProviderMetadata, fetch_json};
use crate::error::{OidcError, Result};
use crate::jwks::{JwksCache, candidate_keys};

#[derive(Debug, Clone)]
struct CachedMetadata {
    metadata: ProviderMetadata,
    jwks_uri: Url,
    cached_at: Instant,
}

/// Verifies ID token signatures with the keys a provider publishes
///
/// Holds the provider's discovery document and JWKS in memory; share one
/// instance (behind an `Arc`) per provider.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use idtoken::{IdTokenValidator, ValidationContext};
/// # use idtoken_oidc::OidcKeyService;
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_example";
/// let keys = OidcKeyService::new(issuer)?;
/// let validator = IdTokenValidator::new(Arc::new(keys));
///
/// let ctx = ValidationContext::with_timeout(std::time::Duration::from_secs(5));
/// let claims = validator.validate(&ctx, issuer, token).await?;
/// println!("authenticated {}", claims.sub);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OidcKeyService {
    issuer: String,
    discovery_url: Url,
    http_client: reqwest::Client,
    config: OidcConfig,
    metadata: RwLock<Option<CachedMetadata>>,
    jwks: JwksCache,
}

impl OidcKeyService {
    /// Key service for `issuer` with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(issuer: impl Into<String>) -> Result<Self> {
        Self::with_config(issuer, OidcConfig::default())
    }

    /// Key service for `issuer` with custom configuration
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn with_config(issuer: impl Into<String>, config: OidcConfig) -> Result<Self> {
        let issuer = issuer.into();
        discovery::parse_issuer(&issuer, config.allow_insecure_loopback)?;
        let discovery_url = discovery::discovery_url(&issuer)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OidcError::HttpClient(e.to_string()))?;

        let jwks = JwksCache::new(
            http_client.clone(),
            config.jwks_cache_ttl(),
            config.min_refresh_interval(),
            config.max_response_bytes,
        );

        Ok(Self {
            issuer,
            discovery_url,
            http_client,
            config,
            metadata: RwLock::new(None),
            jwks,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn discovery_url(&self) -> &Url {
        &self.discovery_url
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Provider metadata, fetched on first use and cached for its TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched, is not valid JSON,
    /// names another issuer or has an unusable `jwks_uri`.
    pub async fn provider_metadata(&self, ctx: &ValidationContext) -> Result<ProviderMetadata> {
        self.resolve_metadata(ctx)
            .await
            .map(|cached| cached.metadata)
    }

    async fn resolve_metadata(&self, ctx: &ValidationContext) -> Result<CachedMetadata> {
        {
            let cache = self.metadata.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.cached_at.elapsed() < self.config.metadata_cache_ttl()
            {
                debug!(issuer = %self.issuer, "Using cached provider metadata");
                return Ok(cached.clone());
            }
        }

        info!(url = %self.discovery_url, "Fetching provider metadata");
        let metadata: ProviderMetadata = fetch_json(
            &self.http_client,
            ctx,
            &self.discovery_url,
            self.config.max_response_bytes,
        )
        .await?;

        let jwks_uri = metadata
            .validate(&self.issuer, self.config.allow_insecure_loopback)
            .inspect_err(|e| warn!(issuer = %self.issuer, error = %e, "Rejected provider metadata"))?;

        let cached = CachedMetadata {
            metadata,
            jwks_uri,
            cached_at: Instant::now(),
        };
        *self.metadata.write().await = Some(cached.clone());
        Ok(cached)
    }

    /// Verify the token's signature and return its payload bytes
    ///
    /// Claims are not inspected; expiry and issuer are the validator's job.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError`]; see [`OidcError::is_discovery`] for how the
    /// variants split between key resolution and signature failures.
    pub async fn verify(&self, ctx: &ValidationContext, token: &str) -> Result<Vec<u8>> {
        ctx.check()?;

        let envelope =
            Envelope::parse(token).map_err(|e| OidcError::UnsupportedToken(e.to_string()))?;
        let compact = envelope.compact_serialization().ok_or_else(|| {
            OidcError::UnsupportedToken(format!(
                "expected exactly one signature, got {}",
                envelope.signature_count()
            ))
        })?;
        let entry = &envelope.signatures()[0];
        let algorithm = parse_algorithm(&entry.algorithm)?;
        let key_id = entry.key_id.as_deref();

        let provider = self.resolve_metadata(ctx).await?;
        let mut jwks = self.jwks.get(ctx, &provider.jwks_uri).await?;

        if candidate_keys(&jwks, key_id, algorithm).is_empty() {
            debug!(kid = ?key_id, "No matching key in cached JWKS, refreshing");
            jwks = self.jwks.refresh(ctx, &provider.jwks_uri).await?;
        }

        verify_with_jwks(&compact, key_id, algorithm, &jwks)?;

        debug!(kid = ?key_id, algorithm = ?algorithm, "Signature verified");
        Ok(envelope.payload().to_vec())
    }

    /// Forget cached metadata and keys
    pub async fn clear_cache(&self) {
        *self.metadata.write().await = None;
        self.jwks.clear().await;
    }
}

#[async_trait]
impl IssuerKeyService for OidcKeyService {
    async fn verify_signature(
        &self,
        ctx: &ValidationContext,
        token: &str,
    ) -> std::result::Result<Vec<u8>, KeyServiceError> {
        self.verify(ctx, token).await.map_err(KeyServiceError::from)
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| OidcError::UnsupportedToken(format!("unknown algorithm {name:?}")))?;

    if matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    ) {
        return Err(OidcError::UnsupportedToken(format!(
            "symmetric algorithm {name} cannot be verified with published keys"
        )));
    }
    Ok(algorithm)
}

/// Signature-only validation: claims are checked by the caller
fn signature_only(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn verify_with_jwks(
    compact: &str,
    key_id: Option<&str>,
    algorithm: Algorithm,
    jwks: &JwkSet,
) -> Result<()> {
    let candidates = candidate_keys(jwks, key_id, algorithm);
    if candidates.is_empty() {
        return Err(OidcError::UnknownKey(key_id.map(str::to_string)));
    }

    let validation = signature_only(algorithm);
    let mut last_error = String::new();

    for jwk in candidates {
        let key = match DecodingKey::from_jwk(jwk) {
            Ok(key) => key,
            Err(e) => {
                warn!(kid = ?jwk.common.key_id, error = %e, "Skipping unusable JWK");
                last_error = format!("invalid JWK: {e}");
                continue;
            }
        };

        match decode::<serde_json::Value>(compact, &key, &validation) {
            Ok(_) => return Ok(()),
            Err(e) => {
                debug!(kid = ?jwk.common.key_id, error = %e, "Key rejected signature");
                last_error = e.to_string();
            }
        }
    }

    Err(OidcError::InvalidSignature(last_error))
}
