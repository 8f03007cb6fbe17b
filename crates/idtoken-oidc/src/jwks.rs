//! JWKS (JSON Web Key Set) fetching and caching
//!
//! - **TTL-based caching**: keys are reused until the TTL runs out
//! - **Refresh on unknown `kid`**: callers force a refresh when a token names
//!   a key the cached set does not have (key rotation)
//! - **Rate limiting**: forced refreshes are spaced by a minimum interval so a
//!   stream of bogus `kid`s cannot hammer the provider

use std::time::{Duration, Instant};

use idtoken::ValidationContext;
use jsonwebtoken::Algorithm;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::discovery::fetch_json;
use crate::error::Result;

/// JWKS cache entry with metadata
#[derive(Debug, Clone)]
struct CachedJwks {
    jwks_uri: Url,
    jwks: JwkSet,
    cached_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, jwks_uri: &Url, ttl: Duration) -> bool {
        &self.jwks_uri == jwks_uri && self.cached_at.elapsed() < ttl
    }
}

/// Cached key set of a single provider
#[derive(Debug)]
pub struct JwksCache {
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    last_refresh: RwLock<Option<Instant>>,
    max_response_bytes: usize,
}

impl JwksCache {
    pub fn new(
        http_client: reqwest::Client,
        cache_ttl: Duration,
        min_refresh_interval: Duration,
        max_response_bytes: usize,
    ) -> Self {
        Self {
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
            min_refresh_interval,
            last_refresh: RwLock::new(None),
            max_response_bytes,
        }
    }

    /// Key set from `jwks_uri`, served from cache while fresh
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable, answers with a non-2xx
    /// status or does not return a JWKS document.
    pub async fn get(&self, ctx: &ValidationContext, jwks_uri: &Url) -> Result<JwkSet> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.is_fresh(jwks_uri, self.cache_ttl)
            {
                debug!(jwks_uri = %jwks_uri, "Using cached JWKS");
                return Ok(cached.jwks.clone());
            }
        }

        self.fetch_and_cache(ctx, jwks_uri).await
    }

    /// Fetch the key set again, ignoring the TTL
    ///
    /// The attempt is recorded before the fetch starts, so concurrent callers
    /// inside the minimum refresh interval are answered from the cache while
    /// one refresh is in flight.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn refresh(&self, ctx: &ValidationContext, jwks_uri: &Url) -> Result<JwkSet> {
        let rate_limited = {
            let mut last_refresh = ctx.run(self.last_refresh.write()).await?;
            match *last_refresh {
                Some(last) if last.elapsed() < self.min_refresh_interval => Some(last.elapsed()),
                _ => {
                    *last_refresh = Some(Instant::now());
                    None
                }
            }
        };

        if let Some(since_last) = rate_limited {
            warn!(
                jwks_uri = %jwks_uri,
                since_last_ms = since_last.as_millis(),
                "JWKS refresh rate limited, using cache"
            );
            return self.get(ctx, jwks_uri).await;
        }

        self.fetch_and_cache(ctx, jwks_uri).await
    }

    async fn fetch_and_cache(&self, ctx: &ValidationContext, jwks_uri: &Url) -> Result<JwkSet> {
        info!(jwks_uri = %jwks_uri, "Fetching JWKS from endpoint");

        let jwks: JwkSet =
            fetch_json(&self.http_client, ctx, jwks_uri, self.max_response_bytes).await?;

        info!(
            jwks_uri = %jwks_uri,
            key_count = jwks.keys.len(),
            "Successfully fetched JWKS"
        );

        // Callers must not hold `last_refresh` across this point
        let now = Instant::now();
        *self.cache.write().await = Some(CachedJwks {
            jwks_uri: jwks_uri.clone(),
            jwks: jwks.clone(),
            cached_at: now,
        });
        *self.last_refresh.write().await = Some(now);

        Ok(jwks)
    }

    /// Drop the cached key set
    pub async fn clear(&self) {
        *self.cache.write().await = None;
        debug!("JWKS cache cleared");
    }
}

/// Keys in `jwks` that may have produced a signature with `algorithm`
///
/// With a `kid` only keys carrying that id qualify; without one every key of
/// the right type does.
pub fn candidate_keys<'a>(
    jwks: &'a JwkSet,
    key_id: Option<&str>,
    algorithm: Algorithm,
) -> Vec<&'a Jwk> {
    jwks.keys
        .iter()
        .filter(|jwk| match key_id {
            Some(kid) => jwk.common.key_id.as_deref() == Some(kid),
            None => true,
        })
        .filter(|jwk| key_fits(jwk, algorithm))
        .collect()
}

fn key_fits(jwk: &Jwk, algorithm: Algorithm) -> bool {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return false;
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(_) => {
            matches!(algorithm, Algorithm::ES256 | Algorithm::ES384)
        }
        AlgorithmParameters::OctetKeyPair(_) => algorithm == Algorithm::EdDSA,
        // Symmetric keys are never published for ID token verification
        _ => false,
    }
}
