//! Web push notification infrastructure.
//!
//! Encrypts payloads for browser push subscriptions, signs VAPID tokens and
//! delivers the result to each subscriber's push service.
//!
//! # Architecture
//!
//! ```text
//! DeliveryDispatcher::deliver_all(subscribers, payload)
//!     ↓  one task per subscriber
//! audience = origin(endpoint) → VapidSigner::sign
//!     ↓
//! ece::encrypt (ephemeral ECDH + HKDF + AES-128-GCM)
//!     ↓
//! POST endpoint → 2xx sent / 410 deactivate / else failed
//! ```
//!
//! # VAPID Keys
//!
//! The operator supplies a P-256 key pair (VAPID, RFC 8292). The public key
//! is what browsers subscribe with; the private key signs a JWT per
//! push-service origin.
//!
//! # Push Subscriptions
//!
//! Browsers send `PushSubscription.toJSON()` to the application, which
//! stores it keyed by endpoint. A 410 from the push service deactivates
//! the stored subscription.

// Rust guideline compliant 2026-02

pub mod ece;
pub mod primitives;
pub mod push;
pub mod subscription;
pub mod vapid;
