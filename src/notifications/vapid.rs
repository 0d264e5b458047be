//! VAPID sender authentication for Web Push (RFC 8292).
//!
//! [`VapidKeys`] holds the application server's P-256 key pair as supplied
//! by configuration. [`VapidSigner`] mints short-lived ES256 JWTs scoped to a
//! single push-service origin.

// Rust guideline compliant 2026-02

use chrono::Utc;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use serde::Serialize;

use crate::codec;
use crate::constants::{UNCOMPRESSED_POINT_LEN, VAPID_TOKEN_TTL_SECS};
use crate::error::PushError;

/// VAPID key pair for web push authentication.
///
/// The public key is the uncompressed SEC1 point (65 bytes, base64url) that
/// browsers pass to `pushManager.subscribe()` as `applicationServerKey`.
#[derive(Debug, Clone)]
pub struct VapidKeys {
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    public_key_b64: String,
    signing_key: SigningKey,
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);
        Self {
            public_key_b64: codec::encode(public_bytes.as_bytes()),
            signing_key,
        }
    }

    /// Reconstruct from base64url-encoded configuration values.
    ///
    /// The private key is normally PKCS8 DER. SEC1 DER and the raw 32-byte
    /// scalar are accepted too, since other web push tooling emits those.
    /// The public key must match the private key.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self, PushError> {
        let pub_bytes = codec::decode(public_key_b64)?;
        if pub_bytes.len() != UNCOMPRESSED_POINT_LEN || pub_bytes[0] != 0x04 {
            return Err(PushError::Encoding(
                "VAPID public key must be 65-byte uncompressed P-256 point".to_string(),
            ));
        }

        let priv_bytes = codec::decode(private_key_b64)?;
        let signing_key = decode_signing_key(&priv_bytes)?;

        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != pub_bytes.as_slice() {
            return Err(PushError::Crypto(
                "VAPID public key does not match private key".to_string(),
            ));
        }

        Ok(Self {
            public_key_b64: codec::encode(&pub_bytes),
            signing_key,
        })
    }

    /// Base64url-encoded uncompressed public key, as sent in the `k=` parameter.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Base64url-encoded PKCS8 DER private key.
    pub fn private_key_base64url(&self) -> Result<String, PushError> {
        let der = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|e| PushError::Crypto(format!("PKCS8 encoding failed: {e}")))?;
        Ok(codec::encode(der.as_bytes()))
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

/// Decode a P-256 private key from PKCS8 DER, SEC1 DER or a raw scalar.
fn decode_signing_key(bytes: &[u8]) -> Result<SigningKey, PushError> {
    if bytes.len() == 32 {
        return SigningKey::from_slice(bytes)
            .map_err(|e| PushError::Crypto(format!("VAPID private key is not a valid P-256 scalar: {e}")));
    }
    if let Ok(sk) = SigningKey::from_pkcs8_der(bytes) {
        return Ok(sk);
    }
    p256::SecretKey::from_sec1_der(bytes)
        .map(SigningKey::from)
        .map_err(|e| {
            PushError::Crypto(format!(
                "VAPID private key is not valid PKCS8 DER, SEC1 DER, or 32-byte scalar: {e}"
            ))
        })
}

/// Prefix `mailto:` onto bare email contacts.
///
/// Subjects that already carry `mailto:` or `https:` are left alone, as is
/// anything without an `@`.
pub fn normalize_subject(subject: &str) -> String {
    if subject.contains('@') && !subject.starts_with("mailto:") && !subject.starts_with("https:") {
        format!("mailto:{subject}")
    } else {
        subject.to_string()
    }
}

/// The `aud` claim for an endpoint: its origin (`scheme://host[:port]`).
pub fn audience_for(endpoint: &str) -> Result<String, PushError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| PushError::Encoding(format!("invalid endpoint URL: {e}")))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(PushError::Encoding(format!(
            "endpoint has no origin: {endpoint}"
        )));
    }
    Ok(origin.ascii_serialization())
}

/// A signed VAPID JWT, valid for one push-service origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidToken {
    /// Compact JWS (`header.payload.signature`).
    pub token: String,
    /// Origin the token is scoped to.
    pub audience: String,
    /// Expiry (Unix seconds).
    pub expires_at: i64,
}

impl VapidToken {
    /// `Authorization` header value: `vapid t=<token>, k=<public key>`.
    pub fn authorization_header(&self, public_key_b64: &str) -> String {
        format!("vapid t={}, k={}", self.token, public_key_b64)
    }
}

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

/// Signs VAPID tokens with the configured key pair and contact subject.
#[derive(Debug, Clone)]
pub struct VapidSigner {
    keys: VapidKeys,
    subject: String,
}

impl VapidSigner {
    /// Create a signer. `subject` is normalized once here.
    pub fn new(keys: VapidKeys, subject: &str) -> Self {
        Self {
            keys,
            subject: normalize_subject(subject),
        }
    }

    /// The key pair this signer uses.
    pub fn keys(&self) -> &VapidKeys {
        &self.keys
    }

    /// The normalized `sub` claim.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sign a token for `audience`, issued now.
    pub fn sign(&self, audience: &str) -> Result<VapidToken, PushError> {
        self.sign_at(audience, Utc::now().timestamp())
    }

    /// Sign a token for `audience`, issued at `now` (Unix seconds).
    ///
    /// `exp` is exactly `now + 86400`.
    pub fn sign_at(&self, audience: &str, now: i64) -> Result<VapidToken, PushError> {
        let expires_at = now + VAPID_TOKEN_TTL_SECS;

        let header = serde_json::to_vec(&JwtHeader {
            alg: "ES256",
            typ: "JWT",
        })
        .map_err(|e| PushError::Crypto(format!("JWT header encoding failed: {e}")))?;
        let claims = serde_json::to_vec(&JwtClaims {
            aud: audience,
            exp: expires_at,
            sub: &self.subject,
        })
        .map_err(|e| PushError::Crypto(format!("JWT claims encoding failed: {e}")))?;

        let signing_input = format!("{}.{}", codec::encode(header), codec::encode(claims));
        let signature: Signature = self
            .keys
            .signing_key()
            .try_sign(signing_input.as_bytes())
            .map_err(|e| PushError::Crypto(format!("ES256 signing failed: {e}")))?;

        Ok(VapidToken {
            token: format!("{signing_input}.{}", codec::encode(signature.to_bytes())),
            audience: audience.to_string(),
            expires_at,
        })
    }
}

/// Sign a VAPID token from raw configuration values.
///
/// Convenience over [`VapidKeys::from_base64url`] + [`VapidSigner`].
pub fn sign(
    audience: &str,
    subject: &str,
    public_key_b64: &str,
    private_key_b64: &str,
) -> Result<VapidToken, PushError> {
    let keys = VapidKeys::from_base64url(public_key_b64, private_key_b64)?;
    VapidSigner::new(keys, subject).sign(audience)
}
