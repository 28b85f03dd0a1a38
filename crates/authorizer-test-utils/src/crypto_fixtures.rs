//! RSA signing fixtures.
//!
//! Two fixed RSA-2048 key pairs, each with a self-signed X.509 certificate
//! over its public key. Fixed keys keep tests fast and let certificate
//! output be compared byte-for-byte against the PEM files.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

/// Key ID of [`TestSigningKey::primary`].
pub const PRIMARY_KID: &str = "test-signing-key-01";

/// Key ID of [`TestSigningKey::secondary`].
pub const SECONDARY_KID: &str = "test-signing-key-02";

/// RSA public exponent 65537, base64url.
pub const RSA_EXPONENT: &str = "AQAB";

/// HMAC secret used by [`hs256_token`].
pub const HS256_SECRET: &[u8] = b"test-hmac-secret-for-algorithm-confusion";

/// An RSA key pair with a certificate, as published in a JWKS.
#[derive(Debug, Clone)]
pub struct TestSigningKey {
    kid: &'static str,
    private_key_pem: &'static str,
    certificate_pem: &'static str,
    certificate_der_base64: &'static str,
    modulus: &'static str,
}

impl TestSigningKey {
    /// The key the mock identity provider normally publishes.
    pub fn primary() -> Self {
        Self {
            kid: PRIMARY_KID,
            private_key_pem: include_str!("../fixtures/signing_key_1.pem"),
            certificate_pem: include_str!("../fixtures/certificate_1.pem"),
            certificate_der_base64: include_str!("../fixtures/certificate_1.der.b64"),
            modulus: include_str!("../fixtures/modulus_1.b64u"),
        }
    }

    /// An unrelated key, for "signed by someone else" cases.
    pub fn secondary() -> Self {
        Self {
            kid: SECONDARY_KID,
            private_key_pem: include_str!("../fixtures/signing_key_2.pem"),
            certificate_pem: include_str!("../fixtures/certificate_2.pem"),
            certificate_der_base64: include_str!("../fixtures/certificate_2.der.b64"),
            modulus: include_str!("../fixtures/modulus_2.b64u"),
        }
    }

    pub fn kid(&self) -> &str {
        self.kid
    }

    /// The certificate as openssl wrote it (64-column PEM).
    pub fn certificate_pem(&self) -> &str {
        self.certificate_pem
    }

    /// The certificate as it appears in an `x5c` entry.
    pub fn certificate_der_base64(&self) -> &str {
        self.certificate_der_base64.trim()
    }

    /// JWK entry as an Auth0-style provider publishes it.
    pub fn jwk_json(&self) -> Value {
        json!({
            "alg": "RS256",
            "kty": "RSA",
            "use": "sig",
            "n": self.modulus.trim(),
            "e": RSA_EXPONENT,
            "kid": self.kid,
            "x5c": [self.certificate_der_base64()]
        })
    }

    /// Sign `claims` with RS256, naming this key in the header.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_kid(claims, self.kid)
    }

    /// Sign `claims` with RS256 under an arbitrary `kid`.
    pub fn sign_with_kid(&self, claims: &Value, kid: &str) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .expect("fixture private key should parse");
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(kid.to_string());

        encode(&header, claims, &encoding_key).expect("Failed to sign token")
    }
}

/// Sign `claims` with `key` (RS256).
pub fn sign_token(key: &TestSigningKey, claims: &Value) -> String {
    key.sign(claims)
}

/// A token signed with HS256 using [`HS256_SECRET`].
pub fn hs256_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(PRIMARY_KID.to_string());

    encode(&header, claims, &EncodingKey::from_secret(HS256_SECRET)).expect("Failed to sign token")
}

/// A token advertising `"alg": "none"` with a junk signature segment.
pub fn alg_none_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.AAAA")
}

/// JWKS document listing `keys` in order.
pub fn jwks_json(keys: &[&TestSigningKey]) -> Value {
    json!({ "keys": keys.iter().map(|key| key.jwk_json()).collect::<Vec<_>>() })
}

/// Current Unix time in seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Claims valid for the next hour.
pub fn valid_claims(sub: &str) -> Value {
    let now = now();
    json!({
        "sub": sub,
        "iss": "https://tenant.example.com/",
        "aud": "https://api.example.com",
        "iat": now,
        "exp": now + 3600
    })
}
