//! base64url helpers.
//!
//! Browsers hand out subscription keys as unpadded base64url, but some
//! serializers pad them. Decoding accepts both; encoding is always unpadded.

// Rust guideline compliant 2026-02

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};

use crate::error::PushError;

/// Encode bytes as unpadded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64URL.encode(bytes)
}

/// Decode base64url, tolerating trailing `=` padding and surrounding whitespace.
pub fn decode(input: &str) -> Result<Vec<u8>, PushError> {
    let trimmed = input.trim().trim_end_matches('=');
    BASE64URL
        .decode(trimmed)
        .map_err(|e| PushError::Encoding(format!("invalid base64url: {e}")))
}

/// Decode base64url into exactly `N` bytes.
///
/// `what` names the value in the error message (e.g. "auth secret").
pub fn decode_fixed<const N: usize>(input: &str, what: &str) -> Result<[u8; N], PushError> {
    let bytes = decode(input)?;
    if bytes.len() != N {
        return Err(PushError::Encoding(format!(
            "{what} must be {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
