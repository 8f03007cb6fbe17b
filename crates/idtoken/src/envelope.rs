//! Token envelope and payload segment decoding
//!
//! The payload bytes produced here are kept verbatim: they feed local claim
//! parsing and, later, the byte-exact comparison against what the key service
//! verified. Never rebuild them from a parsed structure.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::error::{Result, ValidationError};

/// Delimiter of the JWS compact serialization
pub const SEGMENT_DELIMITER: char = '.';

/// Decode the payload segment of a compact token
///
/// Only the header and payload segments need to exist; the signature segment
/// is never inspected.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedToken`] when the token has fewer than
/// two segments or the payload is not unpadded base64url.
pub fn decode_payload(token: &str) -> Result<Vec<u8>> {
    let segments: Vec<&str> = token.split(SEGMENT_DELIMITER).collect();
    if segments.len() < 2 {
        return Err(ValidationError::malformed_token(format!(
            "malformed jwt, expected 3 parts got {}",
            segments.len()
        )));
    }

    decode_segment(segments[1])
        .map_err(|e| ValidationError::malformed_token(format!("malformed jwt payload: {e}")))
}

fn decode_segment(segment: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(segment)
}

/// How the token was serialized on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serialization {
    /// `header.payload.signature`
    Compact,
    /// JWS JSON serialization, general or flattened
    Json,
}

/// One signature over the payload, as described by its protected header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    /// `alg` header parameter
    pub algorithm: String,
    /// `kid` header parameter, if present
    pub key_id: Option<String>,
    protected: String,
    signature: String,
}

impl SignatureEntry {
    fn parse(protected: &str, signature: &str) -> Result<Self> {
        let header_bytes = decode_segment(protected)
            .map_err(|e| ValidationError::malformed_token(format!("malformed jwt header: {e}")))?;
        let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| ValidationError::malformed_token(format!("invalid jwt header: {e}")))?;

        Ok(Self {
            algorithm: header.alg,
            key_id: header.kid,
            protected: protected.to_string(),
            signature: signature.to_string(),
        })
    }

    /// Base64url protected header segment
    pub fn protected(&self) -> &str {
        &self.protected
    }

    /// Base64url signature segment
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[derive(Debug, Deserialize)]
struct ProtectedHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonEnvelope {
    payload: String,
    #[serde(default)]
    signatures: Option<Vec<JsonSignature>>,
    #[serde(default)]
    protected: Option<String>,
    #[serde(default)]
    signature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonSignature {
    protected: String,
    signature: String,
}

/// Parsed token envelope: signature entries plus the raw payload
#[derive(Debug, Clone)]
pub struct Envelope {
    serialization: Serialization,
    signatures: Vec<SignatureEntry>,
    payload_segment: String,
    payload: Vec<u8>,
}

impl Envelope {
    /// Parse a token in compact or JSON serialization
    ///
    /// A compact token with a missing or empty third segment parses with zero
    /// signature entries; deciding whether that is acceptable is left to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedToken`] for anything that is not a
    /// structurally valid JWS.
    pub fn parse(token: &str) -> Result<Self> {
        if token.trim_start().starts_with('{') {
            Self::parse_json(token)
        } else {
            Self::parse_compact(token)
        }
    }

    fn parse_compact(token: &str) -> Result<Self> {
        let segments: Vec<&str> = token.split(SEGMENT_DELIMITER).collect();
        if segments.len() > 3 {
            return Err(ValidationError::malformed_token(format!(
                "malformed jwt, expected 3 parts got {}",
                segments.len()
            )));
        }

        let payload = decode_payload(token)?;

        let signatures = match segments.get(2) {
            Some(signature) if !signature.is_empty() => {
                vec![SignatureEntry::parse(segments[0], signature)?]
            }
            _ => {
                // Still reject an unreadable header even without a signature
                SignatureEntry::parse(segments[0], "")?;
                Vec::new()
            }
        };

        Ok(Self {
            serialization: Serialization::Compact,
            signatures,
            payload_segment: segments[1].to_string(),
            payload,
        })
    }

    fn parse_json(token: &str) -> Result<Self> {
        let envelope: JsonEnvelope = serde_json::from_str(token).map_err(|e| {
            ValidationError::malformed_token(format!("invalid jws json serialization: {e}"))
        })?;

        let signatures = match (envelope.signatures, envelope.protected, envelope.signature) {
            (Some(entries), None, None) => entries
                .iter()
                .map(|entry| SignatureEntry::parse(&entry.protected, &entry.signature))
                .collect::<Result<Vec<_>>>()?,
            (None, Some(protected), Some(signature)) => {
                vec![SignatureEntry::parse(&protected, &signature)?]
            }
            (None, _, None) => Vec::new(),
            _ => {
                return Err(ValidationError::malformed_token(
                    "jws json serialization mixes general and flattened syntax",
                ));
            }
        };

        let payload = decode_segment(&envelope.payload)
            .map_err(|e| ValidationError::malformed_token(format!("malformed jwt payload: {e}")))?;

        Ok(Self {
            serialization: Serialization::Json,
            signatures,
            payload_segment: envelope.payload,
            payload,
        })
    }

    pub fn serialization(&self) -> Serialization {
        self.serialization
    }

    pub fn signatures(&self) -> &[SignatureEntry] {
        &self.signatures
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Decoded payload bytes, exactly as they appeared in the token
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_segment(&self) -> &str {
        &self.payload_segment
    }

    /// Compact form of a single-signature envelope, `None` otherwise
    pub fn compact_serialization(&self) -> Option<String> {
        match self.signatures.as_slice() {
            [entry] => Some(format!(
                "{}.{}.{}",
                entry.protected(),
                self.payload_segment,
                entry.signature()
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;

    fn b64(input: &str) -> String {
        URL_SAFE_NO_PAD.encode(input)
    }

    fn header(alg: &str) -> String {
        b64(&format!(r#"{{"alg":"{alg}","kid":"k1"}}"#))
    }

    #[test]
    fn test_decode_payload_two_segments() {
        let token = format!("{}.{}", header("RS256"), b64(r#"{"sub":"a"}"#));
        assert_eq!(decode_payload(&token).unwrap(), br#"{"sub":"a"}"#);
    }

    #[test]
    fn test_decode_payload_ignores_signature_segment() {
        let token = format!("{}.{}.!!not-base64!!", header("RS256"), b64("{}"));
        assert_eq!(decode_payload(&token).unwrap(), b"{}");
    }

    #[test]
    fn test_decode_payload_single_segment() {
        let err = decode_payload("just-one-segment").unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_decode_payload_rejects_padding_and_bad_alphabet() {
        let padded = format!("{}.{}", header("RS256"), "e30=");
        assert!(decode_payload(&padded).is_err());

        let standard_alphabet = format!("{}.{}", header("RS256"), "+/+/");
        assert!(decode_payload(&standard_alphabet).is_err());
    }

    #[test]
    fn test_compact_envelope_with_signature() {
        let token = format!("{}.{}.{}", header("RS256"), b64("{}"), b64("sig"));
        let envelope = Envelope::parse(&token).unwrap();

        assert_eq!(envelope.serialization(), Serialization::Compact);
        assert_eq!(envelope.signature_count(), 1);
        assert_eq!(envelope.signatures()[0].algorithm, "RS256");
        assert_eq!(envelope.signatures()[0].key_id.as_deref(), Some("k1"));
        assert_eq!(envelope.signatures()[0].protected(), header("RS256"));
        assert_eq!(envelope.signatures()[0].signature(), b64("sig"));
        assert_eq!(envelope.compact_serialization().as_deref(), Some(token.as_str()));
    }

    #[test]
    fn test_compact_envelope_without_signature() {
        let two_parts = format!("{}.{}", header("RS256"), b64("{}"));
        assert_eq!(Envelope::parse(&two_parts).unwrap().signature_count(), 0);

        let empty_sig = format!("{}.{}.", header("RS256"), b64("{}"));
        let envelope = Envelope::parse(&empty_sig).unwrap();
        assert_eq!(envelope.signature_count(), 0);
        assert!(envelope.compact_serialization().is_none());
    }

    #[test]
    fn test_compact_envelope_rejects_extra_segments() {
        let token = format!("{}.{}.a.b.c", header("RS256"), b64("{}"));
        let err = Envelope::parse(&token).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_compact_envelope_rejects_header_without_alg() {
        let token = format!("{}.{}.{}", b64(r#"{"typ":"JWT"}"#), b64("{}"), b64("sig"));
        let err = Envelope::parse(&token).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_json_general_envelope_with_two_signatures() {
        let token = serde_json::json!({
            "payload": b64(r#"{"iss":"x"}"#),
            "signatures": [
                {"protected": header("RS256"), "signature": b64("one")},
                {"protected": header("ES256"), "signature": b64("two")},
            ],
        })
        .to_string();

        let envelope = Envelope::parse(&token).unwrap();
        assert_eq!(envelope.serialization(), Serialization::Json);
        assert_eq!(envelope.signature_count(), 2);
        assert_eq!(envelope.signatures()[1].algorithm, "ES256");
        assert_eq!(envelope.payload(), br#"{"iss":"x"}"#);
        assert!(envelope.compact_serialization().is_none());
    }

    #[test]
    fn test_json_flattened_envelope_converts_to_compact() {
        let protected = header("RS256");
        let payload = b64("{}");
        let signature = b64("sig");
        let token = serde_json::json!({
            "payload": payload,
            "protected": protected,
            "signature": signature,
        })
        .to_string();

        let envelope = Envelope::parse(&token).unwrap();
        assert_eq!(
            envelope.compact_serialization().unwrap(),
            format!("{protected}.{payload}.{signature}")
        );
    }

    #[test]
    fn test_json_envelope_with_empty_signature_list() {
        let token = serde_json::json!({"payload": b64("{}"), "signatures": []}).to_string();
        assert_eq!(Envelope::parse(&token).unwrap().signature_count(), 0);
    }

    #[test]
    fn test_json_envelope_mixed_syntax_rejected() {
        let token = serde_json::json!({
            "payload": b64("{}"),
            "signature": b64("sig"),
            "signatures": [],
        })
        .to_string();
        assert!(Envelope::parse(&token).is_err());
    }
}
