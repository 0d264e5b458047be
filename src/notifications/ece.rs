//! Message encryption for Web Push (RFC 8291 over RFC 8188 `aes128gcm`).
//!
//! Produces a single-record frame that push services parse positionally:
//!
//! ```text
//! +-----------+--------------+----------+------------------------+---------------------+
//! | salt (16) | rs (4, 4096) | idlen=65 | ephemeral key (65, 04…) | ciphertext + tag    |
//! +-----------+--------------+----------+------------------------+---------------------+
//! ```
//!
//! The plaintext is padded with exactly one `0x02` delimiter and nothing
//! else. Push services were validated against this framing; do not add
//! random padding.

// Rust guideline compliant 2026-02

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use zeroize::Zeroizing;

use crate::codec;
use crate::constants::{
    AUTH_SECRET_LEN, FRAME_HEADER_LEN, LAST_RECORD_DELIMITER, MAX_PLAINTEXT_LEN, RECORD_SIZE,
    SALT_LEN, TAG_LEN, UNCOMPRESSED_POINT_LEN,
};
use crate::error::PushError;
use crate::notifications::primitives::{self, CryptoProvider};
use crate::notifications::subscription::Subscriber;

const WEBPUSH_INFO: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// An encrypted `aes128gcm` message body. One per (payload, subscriber) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedFrame(Vec<u8>);

impl EncryptedFrame {
    /// The full frame (header followed by ciphertext).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The 16-byte salt at the start of the frame.
    pub fn salt(&self) -> &[u8] {
        &self.0[..SALT_LEN]
    }

    /// The sender's ephemeral public key (uncompressed point).
    pub fn ephemeral_public_key(&self) -> &[u8] {
        &self.0[SALT_LEN + 5..FRAME_HEADER_LEN]
    }

    /// Consume the frame, returning the raw body.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Derive `(content encryption key, nonce)` from the ECDH secret.
///
/// `ua_public` is the subscriber key, `as_public` the sender's ephemeral key,
/// both as 65-byte uncompressed points.
fn derive_key_and_nonce(
    shared_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<(Zeroizing<[u8; 16]>, Zeroizing<[u8; 12]>), PushError> {
    let mut key_info =
        Vec::with_capacity(WEBPUSH_INFO.len() + 2 * UNCOMPRESSED_POINT_LEN);
    key_info.extend_from_slice(WEBPUSH_INFO);
    key_info.extend_from_slice(ua_public);
    key_info.extend_from_slice(as_public);

    let ikm = primitives::hkdf_sha256::<32>(auth_secret, shared_secret, &key_info)?;
    let cek = primitives::hkdf_sha256::<16>(salt, ikm.as_slice(), CEK_INFO)?;
    let nonce = primitives::hkdf_sha256::<12>(salt, ikm.as_slice(), NONCE_INFO)?;
    Ok((cek, nonce))
}

/// Encrypt `plaintext` for `subscriber`.
///
/// Draws a fresh ephemeral key and salt from `crypto` for every call.
/// Payloads longer than [`MAX_PLAINTEXT_LEN`] do not fit the one record
/// and are rejected.
pub fn encrypt(
    crypto: &dyn CryptoProvider,
    plaintext: &[u8],
    subscriber: &Subscriber,
) -> Result<EncryptedFrame, PushError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(PushError::Encoding(format!(
            "payload of {} bytes exceeds the {MAX_PLAINTEXT_LEN}-byte record limit",
            plaintext.len()
        )));
    }

    let ua_public_bytes = codec::decode(&subscriber.keys.p256dh)?;
    let ua_public = primitives::parse_uncompressed_point(&ua_public_bytes)?;
    let auth_secret: [u8; AUTH_SECRET_LEN] =
        codec::decode_fixed(&subscriber.keys.auth, "auth secret")?;

    let ephemeral = crypto.ephemeral_key()?;
    let as_public = ephemeral.public_key().to_encoded_point(false);
    let shared = primitives::ecdh(&ephemeral, &ua_public);

    let salt = crypto.salt()?;
    let (cek, nonce) = derive_key_and_nonce(
        shared.as_slice(),
        &auth_secret,
        &ua_public_bytes,
        as_public.as_bytes(),
        &salt,
    )?;

    let mut padded = Vec::with_capacity(plaintext.len() + 1);
    padded.extend_from_slice(plaintext);
    padded.push(LAST_RECORD_DELIMITER);
    let ciphertext = primitives::aes128gcm_seal(&cek, &nonce, &padded)?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + ciphertext.len());
    frame.extend_from_slice(&salt);
    frame.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    frame.push(UNCOMPRESSED_POINT_LEN as u8);
    frame.extend_from_slice(as_public.as_bytes());
    frame.extend_from_slice(&ciphertext);
    Ok(EncryptedFrame(frame))
}

/// Decrypt a single-record frame addressed to the holder of `receiver`.
///
/// This is the user-agent side of [`encrypt`]. Trailing zero padding before
/// the delimiter is tolerated so frames from other senders also open.
pub fn decrypt(
    frame: &[u8],
    receiver: &SecretKey,
    auth_secret: &[u8; AUTH_SECRET_LEN],
) -> Result<Vec<u8>, PushError> {
    if frame.len() < FRAME_HEADER_LEN + TAG_LEN {
        return Err(PushError::Encoding(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }
    let salt = &frame[..SALT_LEN];
    let mut rs_bytes = [0u8; 4];
    rs_bytes.copy_from_slice(&frame[SALT_LEN..SALT_LEN + 4]);
    let rs = u32::from_be_bytes(rs_bytes) as usize;
    let record_len = frame.len() - FRAME_HEADER_LEN;
    if rs <= 1 + TAG_LEN || record_len > rs {
        return Err(PushError::Encoding(format!(
            "record of {record_len} bytes does not fit record size {rs}"
        )));
    }
    let id_len = frame[SALT_LEN + 4] as usize;
    if id_len != UNCOMPRESSED_POINT_LEN {
        return Err(PushError::Encoding(format!(
            "unsupported key id length {id_len}"
        )));
    }
    let as_public_bytes = &frame[SALT_LEN + 5..FRAME_HEADER_LEN];
    let as_public = primitives::parse_uncompressed_point(as_public_bytes)?;

    let ua_public = receiver.public_key().to_encoded_point(false);
    let shared = primitives::ecdh(receiver, &as_public);
    let (cek, nonce) = derive_key_and_nonce(
        shared.as_slice(),
        auth_secret,
        ua_public.as_bytes(),
        as_public_bytes,
        salt,
    )?;

    let mut padded = primitives::aes128gcm_open(&cek, &nonce, &frame[FRAME_HEADER_LEN..])?;
    while padded.last() == Some(&0) {
        padded.pop();
    }
    match padded.pop() {
        Some(LAST_RECORD_DELIMITER) => Ok(padded),
        _ => Err(PushError::Crypto("missing last-record delimiter".to_string())),
    }
}
