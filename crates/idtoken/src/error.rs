//! Error types for ID token validation

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Reasons a token is rejected
///
/// Every variant carries enough context for a log line (expected vs. actual
/// issuer, validation time vs. expiry) without including the token itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Provider metadata or key resolution failed (network, malformed metadata, cancelled)
    #[error("failed to resolve provider keys: {message}")]
    DiscoveryFailure { message: String },

    /// Fewer than two segments, undecodable base64url, or an unreadable header
    #[error("malformed token: {message}")]
    MalformedToken { message: String },

    #[error("id token not signed")]
    UnsignedToken,

    #[error("multiple signatures on id token not supported, got {count}")]
    TooManySignatures { count: usize },

    #[error("id token signed with unsupported algorithm, expected {expected:?} got {actual:?}")]
    UnsupportedAlgorithm {
        expected: Vec<String>,
        actual: String,
    },

    #[error("failed to parse jwt payload: {message}")]
    PayloadParseError { message: String },

    #[error("failed to match issuer expected: {expected} actual: {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("token expired current: {now} actual: {expires}")]
    TokenExpired {
        now: DateTime<Utc>,
        expires: DateTime<Utc>,
    },

    /// Cryptographic verification itself failed
    #[error("signature verification failed: {message}")]
    SignatureInvalid { message: String },

    /// The verified payload differs from the locally decoded one.
    ///
    /// Only reachable after every other check passed, so it points at a bug in
    /// this library or in the key service rather than at a hostile token.
    #[error("internal error, verified payload did not match previously decoded payload")]
    PayloadConsistencyViolation,
}

/// Fieldless discriminant of [`ValidationError`], for matching and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    DiscoveryFailure,
    MalformedToken,
    UnsignedToken,
    TooManySignatures,
    UnsupportedAlgorithm,
    PayloadParseError,
    IssuerMismatch,
    TokenExpired,
    SignatureInvalid,
    PayloadConsistencyViolation,
}

impl ValidationErrorKind {
    /// Stable snake_case key for logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoveryFailure => "discovery_failure",
            Self::MalformedToken => "malformed_token",
            Self::UnsignedToken => "unsigned_token",
            Self::TooManySignatures => "too_many_signatures",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::PayloadParseError => "payload_parse_error",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::TokenExpired => "token_expired",
            Self::SignatureInvalid => "signature_invalid",
            Self::PayloadConsistencyViolation => "payload_consistency_violation",
        }
    }
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationError {
    pub fn discovery_failure(message: impl Into<String>) -> Self {
        Self::DiscoveryFailure {
            message: message.into(),
        }
    }

    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    pub fn payload_parse_error(message: impl Into<String>) -> Self {
        Self::PayloadParseError {
            message: message.into(),
        }
    }

    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            message: message.into(),
        }
    }

    pub fn issuer_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IssuerMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Get the kind of this error
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::DiscoveryFailure { .. } => ValidationErrorKind::DiscoveryFailure,
            Self::MalformedToken { .. } => ValidationErrorKind::MalformedToken,
            Self::UnsignedToken => ValidationErrorKind::UnsignedToken,
            Self::TooManySignatures { .. } => ValidationErrorKind::TooManySignatures,
            Self::UnsupportedAlgorithm { .. } => ValidationErrorKind::UnsupportedAlgorithm,
            Self::PayloadParseError { .. } => ValidationErrorKind::PayloadParseError,
            Self::IssuerMismatch { .. } => ValidationErrorKind::IssuerMismatch,
            Self::TokenExpired { .. } => ValidationErrorKind::TokenExpired,
            Self::SignatureInvalid { .. } => ValidationErrorKind::SignatureInvalid,
            Self::PayloadConsistencyViolation => ValidationErrorKind::PayloadConsistencyViolation,
        }
    }

    /// Get the error key for this error
    pub fn error_code(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Whether this error signals a library or environment bug rather than a bad token
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::PayloadConsistencyViolation)
    }
}

/// Invalid validator configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("accepted algorithm list must not be empty")]
    EmptyAlgorithmList,

    #[error("algorithm {0:?} can never be accepted")]
    ForbiddenAlgorithm(String),
}
