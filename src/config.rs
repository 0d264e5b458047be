//! Configuration loading and persistence.
//!
//! VAPID key material and the contact subject are supplied by the operator,
//! either in `config.json` or through environment variables. The loaded
//! [`Config`] is passed explicitly into signer and dispatcher construction.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::notifications::vapid::{VapidKeys, VapidSigner};

/// Configuration for web push delivery.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Config {
    /// VAPID public key (base64url uncompressed P-256 point).
    #[serde(default)]
    pub vapid_public_key: String,
    /// VAPID private key (base64url PKCS8 DER).
    #[serde(default)]
    pub vapid_private_key: String,
    /// Contact for the push service operator (`mailto:` or `https:` URL).
    #[serde(default)]
    pub subject: String,
    /// Where the subscriber store is persisted. Defaults to
    /// `<config dir>/subscriptions.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions_path: Option<PathBuf>,
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `WEBPUSH_CONFIG_DIR` overrides the platform config dir
    /// (e.g. `~/.config/webpush` on Linux).
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("WEBPUSH_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("webpush")
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from the config directory, with environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from_dir(&Self::config_dir()?)
    }

    /// Loads `config.json` from `dir` (defaults if absent), then applies
    /// environment overrides.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.json");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            serde_json::from_str(&content).context("Failed to parse config.json")?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        if config.subscriptions_path.is_none() {
            config.subscriptions_path = Some(dir.join("subscriptions.json"));
        }
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(public_key) = std::env::var("WEBPUSH_VAPID_PUBLIC_KEY") {
            self.vapid_public_key = public_key;
        }

        if let Ok(private_key) = std::env::var("WEBPUSH_VAPID_PRIVATE_KEY") {
            self.vapid_private_key = private_key;
        }

        if let Ok(subject) = std::env::var("WEBPUSH_SUBJECT") {
            self.subject = subject;
        }

        if let Ok(path) = std::env::var("WEBPUSH_SUBSCRIPTIONS") {
            self.subscriptions_path = Some(PathBuf::from(path));
        }
    }

    /// Persists the configuration as `config.json` in `dir`.
    ///
    /// The file holds the private key, so it is owner read/write only.
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let config_path = dir.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        // Set restrictive permissions (owner read/write only)
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Persists the configuration to the config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to_dir(&Self::config_dir()?)
    }

    /// Validated VAPID key pair. Missing or malformed keys are a hard error.
    pub fn vapid_keys(&self) -> Result<VapidKeys> {
        anyhow::ensure!(
            !self.vapid_public_key.is_empty() && !self.vapid_private_key.is_empty(),
            "VAPID keys not configured (set WEBPUSH_VAPID_PUBLIC_KEY / WEBPUSH_VAPID_PRIVATE_KEY or run `webpush generate-keys`)"
        );
        VapidKeys::from_base64url(&self.vapid_public_key, &self.vapid_private_key)
            .context("Invalid VAPID key configuration")
    }

    /// Build a signer from the configured keys and subject.
    pub fn signer(&self) -> Result<VapidSigner> {
        anyhow::ensure!(!self.subject.is_empty(), "VAPID subject not configured (set WEBPUSH_SUBJECT)");
        Ok(VapidSigner::new(self.vapid_keys()?, &self.subject))
    }

    /// Path of the persisted subscriber store.
    pub fn subscriptions_path(&self) -> Result<PathBuf> {
        match &self.subscriptions_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("subscriptions.json")),
        }
    }
}
