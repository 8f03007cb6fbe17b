//! Key service errors

use idtoken::{ContextError, KeyServiceError};
use thiserror::Error;

/// Result alias for the key service
pub type Result<T> = std::result::Result<T, OidcError>;

/// Failures while resolving provider keys or checking a signature
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OidcError {
    /// Configured issuer is not a usable URL
    #[error("invalid issuer url {url:?}: {reason}")]
    InvalidIssuer { url: String, reason: String },

    /// Endpoint is not https and not an allowed loopback address
    #[error("endpoint {0} must use https")]
    InsecureEndpoint(String),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// Transport-level failure
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} exceeds {limit} bytes")]
    ResponseTooLarge { url: String, limit: usize },

    /// Body is not the expected JSON document
    #[error("invalid document from {url}: {message}")]
    InvalidDocument { url: String, message: String },

    /// Discovery document names a different issuer
    #[error("discovery document issuer {actual:?} does not match configured issuer {expected:?}")]
    IssuerMismatch { expected: String, actual: String },

    #[error(transparent)]
    Context(#[from] ContextError),

    /// Token cannot be verified with published keys at all
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),

    /// No published key matches the token header
    #[error("no signing key found for kid {0:?}")]
    UnknownKey(Option<String>),

    /// Every candidate key rejected the signature
    #[error("signature verification failed: {0}")]
    InvalidSignature(String),
}

impl OidcError {
    pub(crate) fn request(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Request {
            url: url.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_document(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidDocument {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Whether the failure happened while resolving keys rather than checking
    /// the signature
    pub fn is_discovery(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedToken(_) | Self::UnknownKey(_) | Self::InvalidSignature(_)
        )
    }
}

impl From<OidcError> for KeyServiceError {
    fn from(err: OidcError) -> Self {
        if err.is_discovery() {
            KeyServiceError::discovery(err.to_string())
        } else {
            KeyServiceError::signature(err.to_string())
        }
    }
}
