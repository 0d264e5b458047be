//! webpush-dispatch - Web Push message delivery.
//!
//! Encrypts application payloads for browser push subscriptions
//! (RFC 8291 / RFC 8188 `aes128gcm`), authenticates the sender with VAPID
//! (RFC 8292), and fans one message out to many subscribers with per-subscriber
//! failure isolation.
//!
//! # Architecture
//!
//! ```text
//! DeliveryDispatcher ── per subscriber task ──┬── VapidSigner  (JWT for endpoint origin)
//!        │                                    ├── ece::encrypt (aes128gcm frame)
//!        │                                    └── POST <endpoint>
//!        └── SubscriberStore (list / lookup / deactivate on 410)
//! ```
//!
//! # Modules
//!
//! - [`codec`] - base64url helpers
//! - [`notifications`] - encryption, signing, subscriptions and dispatch
//! - [`config`] - configuration loading/saving
//! - [`error`] - the delivery error taxonomy

// Rust guideline compliant 2026-02

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod notifications;

// Re-export commonly used types
pub use config::Config;
pub use error::PushError;
pub use notifications::push::{DeliveryDispatcher, DeliveryOutcome, DeliverySummary};
pub use notifications::subscription::{
    MemorySubscriberStore, Subscriber, SubscriberKeys, SubscriberStore,
};
pub use notifications::vapid::{VapidKeys, VapidSigner, VapidToken};
