//! Claims model and epoch-time parsing

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ValidationError};

/// Delimiter between entries of the `scope` claim
pub const SCOPE_DELIMITER: char = ' ';

/// Split a scope string on single spaces
///
/// No trimming and no deduplication: `"a  b"` yields `["a", "", "b"]` and
/// `""` yields `[""]`.
pub fn split_scopes(scope: &str) -> Vec<String> {
    scope.split(SCOPE_DELIMITER).map(str::to_string).collect()
}

/// An instant parsed from Unix epoch seconds
///
/// On the wire the value may be a JSON integer or a JSON float; floats are
/// truncated toward zero. Either way the result is a whole-second instant.
///
/// Values are limited to the range `chrono` can represent (roughly ±262,000
/// years around the epoch). Anything outside it is rejected as a payload
/// parse error rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochTime(DateTime<Utc>);

/// Wire shapes accepted for epoch seconds
#[derive(Debug, Clone, Copy)]
enum EpochNumber {
    Integer(i64),
    Float(f64),
}

impl EpochTime {
    /// The Unix epoch, used for absent time claims
    pub const UNIX_EPOCH: Self = Self(DateTime::<Utc>::UNIX_EPOCH);

    /// Instant at `secs` whole seconds since the Unix epoch
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Self)
    }

    fn normalize(value: EpochNumber) -> std::result::Result<Self, String> {
        let secs = match value {
            EpochNumber::Integer(secs) => secs,
            EpochNumber::Float(secs) => {
                if !secs.is_finite() || secs >= i64::MAX as f64 || secs < i64::MIN as f64 {
                    return Err(format!("epoch seconds {secs} out of range"));
                }
                secs.trunc() as i64
            }
        };
        Self::from_unix_seconds(secs).ok_or_else(|| format!("epoch seconds {secs} out of range"))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl Default for EpochTime {
    fn default() -> Self {
        Self::UNIX_EPOCH
    }
}

impl From<EpochTime> for DateTime<Utc> {
    fn from(value: EpochTime) -> Self {
        value.0
    }
}

impl fmt::Display for EpochTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for EpochTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.unix_seconds())
    }
}

impl<'de> Deserialize<'de> for EpochTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct EpochVisitor;

        impl Visitor<'_> for EpochVisitor {
            type Value = EpochTime;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("epoch seconds as an integer or floating-point number")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<EpochTime, E> {
                EpochTime::normalize(EpochNumber::Integer(value)).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<EpochTime, E> {
                let secs = i64::try_from(value)
                    .map_err(|_| E::custom(format!("epoch seconds {value} out of range")))?;
                EpochTime::normalize(EpochNumber::Integer(secs)).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<EpochTime, E> {
                EpochTime::normalize(EpochNumber::Float(value)).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(EpochVisitor)
    }
}

/// ID token claims
///
/// Absent members take their default value, so a token without `exp` carries
/// the Unix epoch and is rejected as expired. Members not modelled here are
/// kept in [`Claims::additional`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Subject identifier
    pub sub: String,

    /// Token use tag (e.g. `id` or `access`)
    pub token_use: String,

    /// Space-delimited scopes
    pub scope: String,

    /// When the end user authenticated
    pub auth_time: EpochTime,

    /// Issuer
    pub iss: String,

    /// Expiration time
    pub exp: EpochTime,

    /// Issued at
    pub iat: EpochTime,

    /// Schema / version tag
    pub version: i64,

    /// Unique token identifier
    pub jti: String,

    /// Client the token was issued to
    pub client_id: String,

    /// Additional claims
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Parse claims from raw payload bytes
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PayloadParseError`] for invalid JSON or
    /// ill-typed members.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| ValidationError::payload_parse_error(e.to_string()))
    }

    /// Scopes as an ordered list, see [`split_scopes`]
    pub fn scopes(&self) -> Vec<String> {
        split_scopes(&self.scope)
    }

    /// Look up a claim that is not part of the typed model
    pub fn additional_claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.additional.get(name)
    }
}
