//! ID token validation orchestrator
//!
//! Runs the validation sequence in a fixed order:
//!
//! ```text
//! Start ─► Decoded ─► CheapValidated ─► SignatureVerified ─► Consistent ─► Accepted
//!   │         │              │                  │                 │
//!   └─────────┴──────────────┴──────── Rejected(reason) ──────────┘
//! ```
//!
//! Everything up to `CheapValidated` is local computation. Garbage is
//! rejected before the Issuer Key Service is asked to do network work. Claims
//! read during the cheap checks only prune cost; they are returned only after
//! the signature verified and the verified payload matched byte for byte.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::checks;
use crate::claims::Claims;
use crate::clock::{Clock, SystemClock};
use crate::config::ValidatorConfig;
use crate::context::ValidationContext;
use crate::envelope::Envelope;
use crate::error::{Result, ValidationError};
use crate::key_service::IssuerKeyService;

/// Progress of a single validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Start,
    Decoded,
    CheapValidated,
    SignatureVerified,
    Consistent,
    Accepted,
}

impl ValidationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Decoded => "decoded",
            Self::CheapValidated => "cheap_validated",
            Self::SignatureVerified => "signature_verified",
            Self::Consistent => "consistent",
            Self::Accepted => "accepted",
        }
    }
}

/// Validates ID tokens from a single trusted provider
///
/// Holds no per-call state; one instance can serve concurrent calls.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use idtoken::{IdTokenValidator, IssuerKeyService, ValidationContext};
/// # async fn example(keys: Arc<dyn IssuerKeyService>, token: &str) -> idtoken::Result<()> {
/// let validator = IdTokenValidator::new(keys);
/// let ctx = ValidationContext::with_timeout(std::time::Duration::from_secs(5));
///
/// let claims = validator
///     .validate(&ctx, "https://cognito-idp.us-east-1.amazonaws.com/pool", token)
///     .await?;
/// println!("token for {} with scopes {:?}", claims.sub, claims.scopes());
/// # Ok(())
/// # }
/// ```
pub struct IdTokenValidator {
    key_service: Arc<dyn IssuerKeyService>,
    config: ValidatorConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for IdTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenValidator")
            .field("key_service", &"<dyn IssuerKeyService>")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish()
    }
}

impl IdTokenValidator {
    /// Validator with the default policy (`RS256` only) and the system clock
    pub fn new(key_service: Arc<dyn IssuerKeyService>) -> Self {
        Self::with_config(key_service, ValidatorConfig::default())
    }

    pub fn with_config(key_service: Arc<dyn IssuerKeyService>, config: ValidatorConfig) -> Self {
        Self {
            key_service,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock read by [`Self::validate`]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate `token` against `provider_url` at the clock's current time
    ///
    /// # Errors
    ///
    /// See [`Self::validate_at`].
    pub async fn validate(
        &self,
        ctx: &ValidationContext,
        provider_url: &str,
        token: &str,
    ) -> Result<Claims> {
        let now = self.clock.now();
        self.validate_at(ctx, provider_url, token, now).await
    }

    /// Validate `token` against `provider_url` as of `now`
    ///
    /// `ctx` is handed to the Issuer Key Service untouched.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as a [`ValidationError`]:
    /// - `MalformedToken` if the envelope or payload cannot be decoded
    /// - `UnsignedToken`, `TooManySignatures`, `UnsupportedAlgorithm` for bad signature entries
    /// - `PayloadParseError`, `IssuerMismatch`, `TokenExpired` for bad claims
    /// - `DiscoveryFailure`, `SignatureInvalid` from the key service
    /// - `PayloadConsistencyViolation` if the verified payload differs
    #[tracing::instrument(
        name = "idtoken.validate",
        skip_all,
        fields(provider_url = %provider_url)
    )]
    pub async fn validate_at(
        &self,
        ctx: &ValidationContext,
        provider_url: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims> {
        let mut stage = ValidationStage::Start;
        let outcome = self
            .run_stages(ctx, provider_url, token, now, &mut stage)
            .await;

        match &outcome {
            Ok(claims) => {
                debug!(
                    stage = ValidationStage::Accepted.as_str(),
                    subject = %claims.sub,
                    client_id = %claims.client_id,
                    expires = %claims.exp,
                    "ID token accepted"
                );
            }
            Err(err) if err.is_internal() => {
                error!(
                    stage = stage.as_str(),
                    kind = err.error_code(),
                    error = %err,
                    "ID token validation hit an internal invariant failure"
                );
            }
            Err(err) => {
                warn!(
                    stage = stage.as_str(),
                    kind = err.error_code(),
                    error = %err,
                    "ID token rejected"
                );
            }
        }

        outcome
    }

    async fn run_stages(
        &self,
        ctx: &ValidationContext,
        provider_url: &str,
        token: &str,
        now: DateTime<Utc>,
        stage: &mut ValidationStage,
    ) -> Result<Claims> {
        let envelope = Envelope::parse(token)?;
        *stage = ValidationStage::Decoded;

        // Throw out tokens with bad envelopes or claims before asking the key
        // service to do anything that may touch the network.
        let count = envelope.signature_count();
        if count == 0 {
            return Err(ValidationError::UnsignedToken);
        }
        if !checks::signature_count_ok(count) {
            return Err(ValidationError::TooManySignatures { count });
        }

        let algorithm = &envelope.signatures()[0].algorithm;
        let accepted = &self.config.accepted_algorithms;
        if !checks::algorithm_accepted(algorithm, accepted) {
            return Err(ValidationError::UnsupportedAlgorithm {
                expected: accepted.as_slice().to_vec(),
                actual: algorithm.clone(),
            });
        }

        let claims = Claims::from_payload(envelope.payload())?;

        if !checks::issuer_matches(&claims.iss, provider_url) {
            return Err(ValidationError::issuer_mismatch(provider_url, &claims.iss));
        }

        if !checks::not_expired(&claims.exp, now) {
            return Err(ValidationError::TokenExpired {
                now,
                expires: claims.exp.as_datetime(),
            });
        }
        *stage = ValidationStage::CheapValidated;

        let verified = self.key_service.verify_signature(ctx, token).await?;
        *stage = ValidationStage::SignatureVerified;

        if !checks::payloads_consistent(envelope.payload(), &verified) {
            return Err(ValidationError::PayloadConsistencyViolation);
        }
        *stage = ValidationStage::Consistent;

        Ok(claims)
    }
}

/// Validate with the default policy
///
/// Convenience wrapper for one-off calls; prefer a long-lived
/// [`IdTokenValidator`] in services.
///
/// # Errors
///
/// See [`IdTokenValidator::validate_at`].
pub async fn validate_token(
    ctx: &ValidationContext,
    key_service: Arc<dyn IssuerKeyService>,
    provider_url: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Claims> {
    IdTokenValidator::new(key_service)
        .validate_at(ctx, provider_url, token, now)
        .await
}
