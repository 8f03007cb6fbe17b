//! Common test utilities for key service integration tests
//!
//! Provides a mock OpenID provider (discovery document and JWKS endpoint) and
//! helpers to sign ID tokens with fixture RSA keys.

#![allow(dead_code)]

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const RSA_A_PEM: &[u8] = include_bytes!("../fixtures/rsa_a.pem");
pub const RSA_B_PEM: &[u8] = include_bytes!("../fixtures/rsa_b.pem");

const RSA_A_N: &str = "nHd94ROpKxjP0JTvRaOiLYV61eWn6YqJPCDXiZ9_pid2geCus-b4aXcCcaEjqYYSdYCJITuxX-RFZV52YhuWb-hnZbQ87sSWersB868NQrWocbrNYsVy1Z61yDj8GBMfUjClpKtoZwVH6r9n8New6--7oi6vrkXCOGRBxvQn0qUK2IPhTiFpyzq5ylorb9JdxGAD6tCjQcCzC0AZN6xyJmAOM8N0oaPgpx7ENgkpWpGPvFeooVEtUU1fawMev4N_2vbb_QHx0QA-22H4Yz7QVAeNfWGE40AMGPzZo-LIF7Nb58kSG-DX7wNX0L1h4e42rBUuvQwj9yJgGZZeUsyAow";
const RSA_B_N: &str = "u7rW9Us3esZOty6_NS6P6XDyG33K_9E0YSyHfRUs11KYfF5Jkw18HFULFiJMfR1S8VUFFvJ8H2ZKPeWdYlRDYa7yxmR1DKOvFM67yT7GqDcivi56jvc79zAFwBePL7EAsqnjsZyKG0emDfnexJRuCTosMhufNN2eaK6uKwtI89TjR_DtioDDlRmwOBLjXQVFieIOXdaaGe37fvv1q4i9heKQXjdx_1pyWhSxCR270zUPeDwaNXQaM-JoGqW9h6CVPoqaJdX39Z_GD02ee3aGxSdFyCfrafPzFBAxVDIJ-40lp2CWoVyNvJEB3kXp8nAeDIYzv9kzuBp478ZR20yG-Q";

pub const KID_A: &str = "key-a";
pub const KID_B: &str = "key-b";

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const JWKS_PATH: &str = "/jwks";

/// Public JWK for fixture key A
pub fn jwk_a() -> Value {
    rsa_jwk(KID_A, RSA_A_N)
}

/// Public JWK for fixture key B
pub fn jwk_b() -> Value {
    rsa_jwk(KID_B, RSA_B_N)
}

fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": n,
        "e": "AQAB",
    })
}

/// Mock OpenID provider served over loopback http
pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    pub fn discovery_document(&self) -> Value {
        json!({
            "issuer": self.issuer(),
            "jwks_uri": self.jwks_uri(),
            "authorization_endpoint": format!("{}/oauth2/authorize", self.issuer()),
            "token_endpoint": format!("{}/oauth2/token", self.issuer()),
            "response_types_supported": ["code", "token"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"],
        })
    }

    /// Discovery endpoint answering with [`Self::discovery_document`]
    pub fn discovery(&self) -> Mock {
        self.discovery_with(self.discovery_document())
    }

    pub fn discovery_with(&self, document: Value) -> Mock {
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
    }

    pub fn discovery_status(&self, status: u16) -> Mock {
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(ResponseTemplate::new(status))
    }

    /// JWKS endpoint publishing `keys`
    pub fn jwks(&self, keys: Vec<Value>) -> Mock {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
    }

    /// Discovery plus a JWKS holding key A, each expected exactly once
    pub async fn mount_default(&self) {
        self.discovery().expect(1).mount(&self.server).await;
        self.jwks(vec![jwk_a()]).expect(1).mount(&self.server).await;
    }
}

/// ID token claims for `issuer`, valid for another hour
pub fn id_token_claims(issuer: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "248289761001",
        "token_use": "id",
        "scope": "openid profile",
        "auth_time": now - 30,
        "iss": issuer,
        "exp": now + 3600,
        "iat": now - 30,
        "version": 2,
        "jti": "0d1b2b5c-8f6e-4a0e-9d51-3c8f1e6b7a20",
        "client_id": "s6BhdRkqt3",
    })
}

/// Sign `claims` with RS256 using a fixture key
pub fn sign(claims: &Value, kid: Option<&str>, pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = kid.map(str::to_string);

    let key = EncodingKey::from_rsa_pem(pem).expect("Invalid RSA key");
    encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// Replace the payload segment while keeping header and signature
pub fn swap_payload(token: &str, claims: &Value) -> String {
    let segments: Vec<&str> = token.split('.').collect();
    format!(
        "{}.{}.{}",
        segments[0],
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        segments[2]
    )
}

/// Install a test-friendly tracing subscriber (idempotent)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("idtoken=debug,idtoken_oidc=debug")
        .with_test_writer()
        .try_init();
}
