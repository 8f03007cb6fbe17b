//! Issuer Key Service seam
//!
//! Key discovery, JWKS retrieval and signature math live behind this trait so
//! the validator can be exercised with a deterministic fake. The network-backed
//! implementation ships in the `idtoken-oidc` crate.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{ContextError, ValidationContext};
use crate::error::ValidationError;

/// Failures reported by an Issuer Key Service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyServiceError {
    /// Provider metadata or key material could not be obtained
    #[error("key discovery failed: {message}")]
    Discovery { message: String },

    /// Keys were available but the signature did not verify
    #[error("signature rejected: {message}")]
    Signature { message: String },
}

impl KeyServiceError {
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }
}

impl From<ContextError> for KeyServiceError {
    fn from(err: ContextError) -> Self {
        Self::discovery(err.to_string())
    }
}

impl From<KeyServiceError> for ValidationError {
    fn from(err: KeyServiceError) -> Self {
        match err {
            KeyServiceError::Discovery { message } => Self::DiscoveryFailure { message },
            KeyServiceError::Signature { message } => Self::SignatureInvalid { message },
        }
    }
}

/// Resolves an issuer's signing keys and verifies token signatures
///
/// Implementations own every network round trip, key cache and retry policy.
/// They must honour `ctx` so callers can bound the total validation latency.
#[async_trait]
pub trait IssuerKeyService: Send + Sync {
    /// Verify the token signature and return the payload bytes it certifies
    ///
    /// # Errors
    ///
    /// Returns [`KeyServiceError::Discovery`] when keys cannot be resolved and
    /// [`KeyServiceError::Signature`] when verification fails.
    async fn verify_signature(
        &self,
        ctx: &ValidationContext,
        token: &str,
    ) -> Result<Vec<u8>, KeyServiceError>;
}

#[async_trait]
impl<T> IssuerKeyService for Arc<T>
where
    T: IssuerKeyService + ?Sized,
{
    async fn verify_signature(
        &self,
        ctx: &ValidationContext,
        token: &str,
    ) -> Result<Vec<u8>, KeyServiceError> {
        (**self).verify_signature(ctx, token).await
    }
}
