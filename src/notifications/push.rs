//! Web push message delivery.
//!
//! Sends encrypted web push messages (RFC 8030) with VAPID authentication
//! (RFC 8292) and fans a single payload out to many subscribers.
//!
//! Every delivery is a single attempt. There is no retry, backoff, rate
//! limiting or concurrency cap; a later notification is the retry.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::constants::{self, PUSH_TTL_SECS, PUSH_URGENCY};
use crate::error::PushError;
use crate::notifications::ece;
use crate::notifications::primitives::{CryptoProvider, SystemCrypto};
use crate::notifications::subscription::{short_endpoint, Subscriber, SubscriberStore};
use crate::notifications::vapid::{audience_for, VapidSigner};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// Whether the push service accepted the message.
    pub success: bool,
    /// Push service status code, `404` for unknown endpoints, `0` when no
    /// response was received.
    pub status_code: u16,
    /// Human-readable detail for logs and callers.
    pub detail: String,
}

impl DeliveryOutcome {
    fn sent(status_code: u16) -> Self {
        Self {
            success: true,
            status_code,
            detail: "sent".to_string(),
        }
    }

    fn failed(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            detail: detail.into(),
        }
    }
}

/// Aggregate result of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    /// Deliveries accepted by their push service.
    pub sent: usize,
    /// Deliveries that failed for any reason, including 410 Gone.
    pub failed: usize,
}

/// Delivers push messages to subscribers.
///
/// Cheap to clone: the HTTP client pools connections and the signer,
/// crypto provider and store are shared.
#[derive(Debug, Clone)]
pub struct DeliveryDispatcher {
    client: reqwest::Client,
    signer: Arc<VapidSigner>,
    crypto: Arc<dyn CryptoProvider>,
    store: Arc<dyn SubscriberStore>,
}

impl DeliveryDispatcher {
    /// Create a dispatcher using OS randomness and a default HTTP client.
    pub fn new(signer: VapidSigner, store: Arc<dyn SubscriberStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            signer: Arc::new(signer),
            crypto: Arc::new(SystemCrypto),
            store,
        }
    }

    /// Use a caller-provided HTTP client (timeouts, proxies, TLS roots).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Replace the randomness source (tests only need this).
    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    /// Deliver `payload` to one subscriber. Never fails; the outcome says how it went.
    ///
    /// A 410 response deactivates the subscriber in the store.
    pub async fn deliver_one(&self, subscriber: &Subscriber, payload: &[u8]) -> DeliveryOutcome {
        let endpoint = short_endpoint(&subscriber.endpoint);
        match self.send(subscriber, payload).await {
            Ok(status) => {
                log::debug!("[WebPush] Delivered to {endpoint} (HTTP {status})");
                DeliveryOutcome::sent(status)
            }
            Err(PushError::Gone) => {
                log::info!("[WebPush] Subscription expired (410 Gone): {endpoint}");
                if let Err(e) = self.store.deactivate(&subscriber.endpoint).await {
                    log::warn!("[WebPush] Failed to deactivate {endpoint}: {e:#}");
                }
                DeliveryOutcome::failed(410, PushError::Gone.to_string())
            }
            Err(e) => {
                log::warn!("[WebPush] Delivery to {endpoint} failed: {e}");
                DeliveryOutcome::failed(e.status_code(), e.to_string())
            }
        }
    }

    /// Deliver `payload` to every subscriber concurrently.
    ///
    /// One task per subscriber; all tasks run to completion before the
    /// counts are tallied. A failed or panicked task only counts as failed.
    pub async fn deliver_all(
        &self,
        subscribers: impl IntoIterator<Item = Subscriber>,
        payload: &[u8],
    ) -> DeliverySummary {
        let payload: Arc<[u8]> = Arc::from(payload);
        let mut tasks = JoinSet::new();
        for subscriber in subscribers {
            let dispatcher = self.clone();
            let payload = Arc::clone(&payload);
            tasks.spawn(async move { dispatcher.deliver_one(&subscriber, &payload).await });
        }

        let mut summary = DeliverySummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) if outcome.success => summary.sent += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    log::error!("[WebPush] Delivery task did not complete: {e}");
                    summary.failed += 1;
                }
            }
        }

        log::info!(
            "[WebPush] Fan-out complete: {} sent, {} failed",
            summary.sent,
            summary.failed
        );
        summary
    }

    /// Deliver `payload` to every active subscriber in the store.
    ///
    /// Fails only if the subscriber list cannot be read.
    pub async fn broadcast(&self, payload: &[u8]) -> Result<DeliverySummary> {
        let subscribers = self
            .store
            .list_active()
            .await
            .context("Failed to list active push subscriptions")?;
        Ok(self.deliver_all(subscribers, payload).await)
    }

    /// Deliver `payload` to the subscriber stored under `endpoint`.
    ///
    /// Unknown or deactivated endpoints yield a 404 outcome without any
    /// network traffic. Fails only if the store lookup itself fails.
    pub async fn deliver_to_endpoint(&self, endpoint: &str, payload: &[u8]) -> Result<DeliveryOutcome> {
        let subscriber = self
            .store
            .get_by_endpoint(endpoint)
            .await
            .context("Failed to look up push subscription")?;
        match subscriber {
            Some(subscriber) => Ok(self.deliver_one(&subscriber, payload).await),
            None => Ok(DeliveryOutcome::failed(404, "not found")),
        }
    }

    /// Sign, encrypt and POST one message. Returns the 2xx status on success.
    async fn send(&self, subscriber: &Subscriber, payload: &[u8]) -> Result<u16, PushError> {
        let audience = audience_for(&subscriber.endpoint)?;
        let token = self.signer.sign(&audience)?;
        let frame = ece::encrypt(self.crypto.as_ref(), payload, subscriber)?;

        let response = self
            .client
            .post(&subscriber.endpoint)
            .header("TTL", PUSH_TTL_SECS.to_string())
            .header(CONTENT_TYPE, constants::CONTENT_TYPE)
            .header(CONTENT_ENCODING, constants::CONTENT_ENCODING)
            .header("Urgency", PUSH_URGENCY)
            .header(
                AUTHORIZATION,
                token.authorization_header(self.signer.keys().public_key_base64url()),
            )
            .body(frame.into_bytes())
            .send()
            .await?;
        let status = response.status().as_u16();

        match status {
            200..=299 => Ok(status),
            410 => Err(PushError::Gone),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(PushError::Rejected { status, body })
            }
        }
    }
}
