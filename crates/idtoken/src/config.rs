//! Validator configuration
//!
//! Deployment policy lives here rather than in code. The struct deserializes
//! from whatever configuration source the embedding service uses; loading the
//! source itself is left to that service.

use serde::{Deserialize, Serialize};

use crate::checks::AcceptedAlgorithms;

/// Policy applied by [`crate::IdTokenValidator`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Signature algorithms accepted on the single signature entry (default: `["RS256"]`)
    pub accepted_algorithms: AcceptedAlgorithms,
}

impl ValidatorConfig {
    /// Replace the accepted algorithm list
    pub fn with_accepted_algorithms(mut self, algorithms: AcceptedAlgorithms) -> Self {
        self.accepted_algorithms = algorithms;
        self
    }
}
