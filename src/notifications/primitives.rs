//! Cryptographic primitives behind a small capability seam.
//!
//! [`CryptoProvider`] owns the only non-deterministic inputs of the
//! `aes128gcm` scheme: the ephemeral ECDH key and the record salt. Production
//! code uses [`SystemCrypto`]; tests plug in [`FixedCrypto`] to reproduce
//! frames byte-for-byte. The deterministic building blocks (ECDH, HKDF,
//! AES-128-GCM) are plain functions.

// Rust guideline compliant 2026-02

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use hkdf::Hkdf;
use p256::elliptic_curve::rand_core::OsRng;
use p256::{PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::constants::SALT_LEN;
use crate::error::PushError;

/// Source of per-frame randomness.
///
/// Implementations must return a fresh key and salt on every call; reusing
/// either across two frames is a protocol violation.
pub trait CryptoProvider: Send + Sync + std::fmt::Debug {
    /// Generate an ephemeral P-256 key pair for a single frame.
    fn ephemeral_key(&self) -> Result<SecretKey, PushError>;

    /// Generate a random salt for a single frame.
    fn salt(&self) -> Result<[u8; SALT_LEN], PushError>;
}

/// Operating-system randomness. The default provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCrypto;

impl CryptoProvider for SystemCrypto {
    fn ephemeral_key(&self) -> Result<SecretKey, PushError> {
        Ok(SecretKey::random(&mut OsRng))
    }

    fn salt(&self) -> Result<[u8; SALT_LEN], PushError> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        Ok(salt)
    }
}

/// Deterministic provider that always returns the same key and salt.
///
/// Only for tests and test vectors: every frame it produces shares its
/// salt and ephemeral key.
#[derive(Debug, Clone)]
pub struct FixedCrypto {
    secret: SecretKey,
    salt: [u8; SALT_LEN],
}

impl FixedCrypto {
    /// Build from a raw 32-byte P-256 scalar and a salt.
    pub fn new(secret_scalar: &[u8], salt: [u8; SALT_LEN]) -> Result<Self, PushError> {
        let secret = SecretKey::from_slice(secret_scalar)
            .map_err(|e| PushError::Crypto(format!("invalid P-256 scalar: {e}")))?;
        Ok(Self { secret, salt })
    }
}

impl CryptoProvider for FixedCrypto {
    fn ephemeral_key(&self) -> Result<SecretKey, PushError> {
        Ok(self.secret.clone())
    }

    fn salt(&self) -> Result<[u8; SALT_LEN], PushError> {
        Ok(self.salt)
    }
}

/// Parse an uncompressed SEC1 P-256 point.
///
/// Compressed points are rejected: the key id in the frame header and the
/// HKDF info string both need the 65-byte form.
pub fn parse_uncompressed_point(bytes: &[u8]) -> Result<PublicKey, PushError> {
    if bytes.len() != crate::constants::UNCOMPRESSED_POINT_LEN || bytes[0] != 0x04 {
        return Err(PushError::Encoding(format!(
            "P-256 public key must be a 65-byte uncompressed point, got {} bytes",
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|e| PushError::Encoding(format!("P-256 public key is not on the curve: {e}")))
}

/// ECDH over P-256, returning the 32-byte x-coordinate shared secret.
pub fn ecdh(secret: &SecretKey, peer: &PublicKey) -> Zeroizing<[u8; 32]> {
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(shared.raw_secret_bytes().as_slice());
    out
}

/// HKDF-SHA256 extract-and-expand into an `N`-byte output.
pub fn hkdf_sha256<const N: usize>(
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
) -> Result<Zeroizing<[u8; N]>, PushError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new([0u8; N]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| PushError::Crypto(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

/// AES-128-GCM seal with no associated data. Output includes the 16-byte tag.
pub fn aes128gcm_seal(key: &[u8; 16], nonce: &[u8; 12], plaintext: &[u8]) -> Result<Vec<u8>, PushError> {
    let cipher = Aes128Gcm::new_from_slice(key)
        .map_err(|e| PushError::Crypto(format!("invalid AES-128 key: {e}")))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| PushError::Crypto(format!("AES-GCM encryption failed: {e}")))
}

/// AES-128-GCM open with no associated data.
pub fn aes128gcm_open(key: &[u8; 16], nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, PushError> {
    let cipher = Aes128Gcm::new_from_slice(key)
        .map_err(|e| PushError::Crypto(format!("invalid AES-128 key: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| PushError::Crypto(format!("AES-GCM decryption failed: {e}")))
}
