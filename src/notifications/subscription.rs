//! Push subscriptions and the subscriber store interface.
//!
//! [`Subscriber`] mirrors the JSON a browser produces from
//! `PushSubscription.toJSON()`. The dispatcher only consumes the
//! [`SubscriberStore`] trait; [`MemorySubscriberStore`] is a small
//! in-process implementation that can persist itself to a JSON file.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

/// A browser's push subscription.
///
/// Uniquely identified by `endpoint`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Expiration time reported by the browser (ms since epoch), if any.
    ///
    /// A `DOMHighResTimeStamp`, so it may carry a fractional part.
    #[serde(default)]
    pub expiration_time: Option<f64>,
    /// Key material for payload encryption.
    pub keys: SubscriberKeys,
}

/// Encryption keys from a push subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberKeys {
    /// Browser's P-256 ECDH public key (base64url, uncompressed point).
    pub p256dh: String,
    /// Shared auth secret (base64url, 16 bytes).
    pub auth: String,
}

/// Subscriber storage consumed by the dispatcher.
///
/// Implementations must tolerate concurrent `deactivate` calls for distinct
/// endpoints.
#[async_trait]
pub trait SubscriberStore: Send + Sync + std::fmt::Debug {
    /// All subscribers that have not been deactivated.
    async fn list_active(&self) -> Result<Vec<Subscriber>>;

    /// Look up a single active subscriber.
    async fn get_by_endpoint(&self, endpoint: &str) -> Result<Option<Subscriber>>;

    /// Mark a subscriber as permanently gone. Idempotent.
    async fn deactivate(&self, endpoint: &str) -> Result<()>;
}

/// Stored subscriber plus its deactivation flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredSubscriber {
    subscriber: Subscriber,
    active: bool,
}

/// In-memory subscriber store keyed by endpoint.
///
/// Deactivated entries are kept (with `active = false`) until removed or
/// re-subscribed, so a 410 is never silently undone by a stale reload.
#[derive(Debug, Default)]
pub struct MemorySubscriberStore {
    entries: RwLock<HashMap<String, StoredSubscriber>>,
}

/// On-disk shape of [`MemorySubscriberStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    subscriptions: Vec<StoredSubscriber>,
}

impl MemorySubscriberStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a subscription. Re-subscribing reactivates the endpoint.
    pub fn upsert(&self, subscriber: Subscriber) {
        let mut entries = self.write();
        if entries
            .get(&subscriber.endpoint)
            .is_some_and(|existing| !existing.active)
        {
            log::info!(
                "[WebPush] Reactivating subscription {}",
                short_endpoint(&subscriber.endpoint)
            );
        }
        entries.insert(
            subscriber.endpoint.clone(),
            StoredSubscriber {
                subscriber,
                active: true,
            },
        );
    }

    /// Remove a subscription entirely. Returns whether it existed.
    pub fn remove(&self, endpoint: &str) -> bool {
        self.write().remove(endpoint).is_some()
    }

    /// Number of stored subscriptions, active or not.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether `endpoint` is stored and active.
    pub fn is_active(&self, endpoint: &str) -> bool {
        self.read().get(endpoint).is_some_and(|e| e.active)
    }

    /// Load a store from a JSON file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subscriptions file {}", path.display()))?;
        let file: StoreFile =
            serde_json::from_str(&content).context("Failed to parse subscriptions file")?;

        let entries = file
            .subscriptions
            .into_iter()
            .map(|e| (e.subscriber.endpoint.clone(), e))
            .collect::<HashMap<_, _>>();
        log::info!("[WebPush] Loaded {} push subscription(s)", entries.len());
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Save the store as pretty JSON (owner read/write only on unix).
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = StoreFile {
            subscriptions: self.read().values().cloned().collect(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create subscriptions directory")?;
        }
        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize subscriptions")?;
        fs::write(path, content).context("Failed to write subscriptions file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .context("Failed to set subscriptions file permissions")?;
        }

        log::debug!("[WebPush] Saved push subscriptions to {:?}", path);
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StoredSubscriber>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StoredSubscriber>> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn list_active(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .read()
            .values()
            .filter(|e| e.active)
            .map(|e| e.subscriber.clone())
            .collect())
    }

    async fn get_by_endpoint(&self, endpoint: &str) -> Result<Option<Subscriber>> {
        Ok(self
            .read()
            .get(endpoint)
            .filter(|e| e.active)
            .map(|e| e.subscriber.clone()))
    }

    async fn deactivate(&self, endpoint: &str) -> Result<()> {
        if let Some(entry) = self.write().get_mut(endpoint) {
            entry.active = false;
        }
        Ok(())
    }
}

/// Shorten an endpoint for logs: push service host plus a token prefix.
pub(crate) fn short_endpoint(endpoint: &str) -> String {
    let without_scheme = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    match without_scheme.split_once('/') {
        Some((host, path)) => {
            let tail = path.rsplit('/').next().unwrap_or(path);
            let prefix: String = tail.chars().take(8).collect();
            format!("{host}/…{prefix}")
        }
        None => without_scheme.to_string(),
    }
}
