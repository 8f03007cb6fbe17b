//! # idtoken-oidc - OpenID Connect Issuer Key Service
//!
//! An [`idtoken::IssuerKeyService`] that resolves a provider's signing keys
//! through OpenID Connect discovery and verifies ID token signatures with
//! [`jsonwebtoken`].
//!
//! ## Flow
//!
//! 1. `GET {issuer}/.well-known/openid-configuration`, checking that the
//!    document names the configured issuer ([`discovery`])
//! 2. `GET jwks_uri`, cached with a TTL and refreshed when a token names an
//!    unknown key ([`jwks`])
//! 3. Verify the signature with the matching key and hand the payload back
//!
//! Every network round trip is bounded by the caller's
//! [`idtoken::ValidationContext`].
//!
//! ## Security
//!
//! - Issuer and `jwks_uri` must be `https`; plain `http` is only accepted on
//!   loopback hosts when [`OidcConfig::allow_insecure_loopback`] is set
//! - Redirects are not followed
//! - Symmetric (`HS*`) tokens are refused
//! - Response bodies are size-limited

pub mod config;
pub mod discovery;
pub mod error;
pub mod jwks;
pub mod service;

pub use config::OidcConfig;
pub use discovery::ProviderMetadata;
pub use error::{OidcError, Result};
pub use jwks::JwksCache;
pub use service::OidcKeyService;
