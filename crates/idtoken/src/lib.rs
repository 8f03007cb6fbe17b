//! # idtoken - OIDC ID Token Validation
//!
//! Validates ID tokens issued by a single trusted OpenID Connect provider and
//! hands back the decoded claims.
//!
//! ## Validation order
//!
//! 1. Decode the envelope and payload ([`envelope`])
//! 2. Cheap checks: one signature, accepted algorithm, parseable claims,
//!    matching issuer, not expired ([`checks`])
//! 3. Signature verification through an [`IssuerKeyService`] (may hit the network)
//! 4. Byte-for-byte comparison of the verified payload with the decoded one
//!
//! A token only pays for step 3 after passing step 2, and no claim is trusted
//! until steps 3 and 4 succeed.
//!
//! ## Architecture
//!
//! - [`envelope`] - Segment decoding and signature entries
//! - [`claims`] - Typed claims and epoch-time parsing
//! - [`checks`] - Pure predicates used by the validator
//! - [`key_service`] - The Issuer Key Service seam
//! - [`context`] - Cancellation and deadlines passed to the key service
//! - [`validator`] - The orchestrator
//!
//! ## Quick Start
//!
//! ```rust
//! use idtoken::split_scopes;
//!
//! assert_eq!(split_scopes("openid profile email"), vec!["openid", "profile", "email"]);
//! ```
//!
//! The `idtoken-oidc` crate provides an [`IssuerKeyService`] backed by OIDC
//! discovery and a cached JWKS.

pub mod checks;
pub mod claims;
pub mod clock;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod key_service;
pub mod validator;

#[doc(inline)]
pub use checks::{AcceptedAlgorithms, DEFAULT_ACCEPTED_ALGORITHM};
#[doc(inline)]
pub use claims::{Claims, EpochTime, split_scopes};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ValidatorConfig;
pub use context::{ContextError, ValidationContext};
pub use envelope::{Envelope, SignatureEntry, decode_payload};
pub use error::{ConfigError, Result, ValidationError, ValidationErrorKind};
pub use key_service::{IssuerKeyService, KeyServiceError};
#[doc(inline)]
pub use validator::{IdTokenValidator, ValidationStage, validate_token};
