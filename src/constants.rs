//! Protocol constants shared across the crate.
//!
//! Values here are fixed by RFC 8188, RFC 8291 and RFC 8292 or by the
//! delivery contract with push services. Changing them breaks interop.

// Rust guideline compliant 2026-02

/// Record size advertised in the `aes128gcm` header.
pub const RECORD_SIZE: u32 = 4096;

/// Length of the random salt at the start of every frame.
pub const SALT_LEN: usize = 16;

/// Length of a subscriber's `auth` secret.
pub const AUTH_SECRET_LEN: usize = 16;

/// Length of an uncompressed SEC1 P-256 point (`0x04 || x || y`).
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// `salt || rs || idlen || keyid` for a P-256 sender key.
pub const FRAME_HEADER_LEN: usize = SALT_LEN + 4 + 1 + UNCOMPRESSED_POINT_LEN;

/// Delimiter appended to the plaintext of the last (only) record.
pub const LAST_RECORD_DELIMITER: u8 = 0x02;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Largest plaintext that fits the single record: `rs - delimiter - tag`.
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - 1 - TAG_LEN;

/// VAPID token lifetime in seconds (24h, the RFC 8292 maximum).
pub const VAPID_TOKEN_TTL_SECS: i64 = 86_400;

/// `TTL` header sent with every push message, in seconds.
pub const PUSH_TTL_SECS: u32 = 86_400;

/// `Urgency` header sent with every push message.
pub const PUSH_URGENCY: &str = "normal";

/// `Content-Encoding` header value for RFC 8291 payloads.
pub const CONTENT_ENCODING: &str = "aes128gcm";

/// `Content-Type` header value for encrypted payloads.
pub const CONTENT_TYPE: &str = "application/octet-stream";

