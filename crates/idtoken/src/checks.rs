//! Stateless claim and envelope checks
//!
//! Each predicate is pure and deterministic. Time is always passed in, never
//! read from the process clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::EpochTime;
use crate::error::ConfigError;

/// Algorithm accepted when nothing else is configured
pub const DEFAULT_ACCEPTED_ALGORITHM: &str = "RS256";

/// Allow-list of JWS `alg` values
///
/// Never empty and never contains `none`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AcceptedAlgorithms(Vec<String>);

impl AcceptedAlgorithms {
    /// Build an allow-list
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAlgorithmList`] for an empty list and
    /// [`ConfigError::ForbiddenAlgorithm`] if `none` is listed.
    pub fn new<I, S>(algorithms: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accepted: Vec<String> = Vec::new();
        for algorithm in algorithms {
            let algorithm = algorithm.into();
            if algorithm.eq_ignore_ascii_case("none") {
                return Err(ConfigError::ForbiddenAlgorithm(algorithm));
            }
            if !accepted.contains(&algorithm) {
                accepted.push(algorithm);
            }
        }

        if accepted.is_empty() {
            return Err(ConfigError::EmptyAlgorithmList);
        }
        Ok(Self(accepted))
    }

    pub fn contains(&self, algorithm: &str) -> bool {
        self.0.iter().any(|accepted| accepted == algorithm)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for AcceptedAlgorithms {
    fn default() -> Self {
        Self(vec![DEFAULT_ACCEPTED_ALGORITHM.to_string()])
    }
}

impl TryFrom<Vec<String>> for AcceptedAlgorithms {
    type Error = ConfigError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AcceptedAlgorithms> for Vec<String> {
    fn from(value: AcceptedAlgorithms) -> Self {
        value.0
    }
}

/// True iff `algorithm` is in the allow-list (case-sensitive)
pub fn algorithm_accepted(algorithm: &str, accepted: &AcceptedAlgorithms) -> bool {
    accepted.contains(algorithm)
}

/// True iff exactly one signature entry is present
pub fn signature_count_ok(count: usize) -> bool {
    count == 1
}

/// Exact string equality, no normalization of trailing slashes or case
pub fn issuer_matches(issuer: &str, expected: &str) -> bool {
    issuer == expected
}

/// True iff `expires` is strictly after `now`
pub fn not_expired(expires: &EpochTime, now: DateTime<Utc>) -> bool {
    expires.as_datetime() > now
}

/// Exact byte equality between the decoded and the verified payload
pub fn payloads_consistent(decoded: &[u8], verified: &[u8]) -> bool {
    decoded == verified
}
