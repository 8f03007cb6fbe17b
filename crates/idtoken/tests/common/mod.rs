//! Common test utilities for validation flow tests
//!
//! Provides a scripted Issuer Key Service and helpers to assemble tokens
//! without real signatures.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use idtoken::{IssuerKeyService, KeyServiceError, ValidationContext, decode_payload};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PROVIDER_URL: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_example";

/// Fixed validation time used across tests
pub fn now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

/// What the fake key service answers
#[derive(Debug, Clone)]
pub enum KeyResponse {
    /// Certify exactly the payload segment of the token it is given
    EchoPayload,
    /// Certify these bytes regardless of the token
    Payload(Vec<u8>),
    Fail(KeyServiceError),
}

/// Scripted Issuer Key Service that records every call
#[derive(Debug)]
pub struct FakeKeyService {
    response: KeyResponse,
    calls: AtomicUsize,
    last_context: Mutex<Option<ValidationContext>>,
}

impl FakeKeyService {
    pub fn new(response: KeyResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn echo() -> Self {
        Self::new(KeyResponse::EchoPayload)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<ValidationContext> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssuerKeyService for FakeKeyService {
    async fn verify_signature(
        &self,
        ctx: &ValidationContext,
        token: &str,
    ) -> Result<Vec<u8>, KeyServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(ctx.clone());

        match &self.response {
            KeyResponse::EchoPayload => {
                decode_payload(token).map_err(|e| KeyServiceError::signature(e.to_string()))
            }
            KeyResponse::Payload(bytes) => Ok(bytes.clone()),
            KeyResponse::Fail(err) => Err(err.clone()),
        }
    }
}

pub fn b64(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn header(alg: &str) -> Value {
    json!({"alg": alg, "kid": "test-key", "typ": "JWT"})
}

/// Compact token with a placeholder signature
pub fn compact_token(header: &Value, payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        b64(header.to_string()),
        b64(payload.to_string()),
        b64("signature")
    )
}

/// Standard ID token claims expiring `exp_offset_secs` after [`now`]
pub fn id_token_claims(exp_offset_secs: i64) -> Value {
    let now = now().timestamp();
    json!({
        "sub": "248289761001",
        "token_use": "id",
        "scope": "openid profile email",
        "auth_time": now - 60,
        "iss": PROVIDER_URL,
        "exp": now + exp_offset_secs,
        "iat": now - 60,
        "version": 2,
        "jti": "6f1d2c1e-0b0a-4c57-9b43-0a5e2d7c1f11",
        "client_id": "s6BhdRkqt3",
    })
}

/// RS256 token, one signature, issuer matches, expires in an hour
pub fn valid_token() -> String {
    compact_token(&header("RS256"), &id_token_claims(3600))
}

/// Install a test-friendly tracing subscriber (idempotent)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("idtoken=debug")
        .with_test_writer()
        .try_init();
}
