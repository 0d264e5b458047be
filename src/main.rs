//! webpush - operator CLI for web push delivery.
//!
//! Wires [`Config`], a JSON-file subscriber store and the
//! [`DeliveryDispatcher`] together. See the `webpush_dispatch` library for
//! the core functionality.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::time::Duration;
use webpush_dispatch::{
    Config, DeliveryDispatcher, MemorySubscriberStore, Subscriber, SubscriberStore, VapidKeys,
};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Upper bound on a single push service round trip.
const PUSH_REQUEST_TIMEOUT_SECS: u64 = 30;

// CLI
#[derive(Parser)]
#[command(name = "webpush")]
#[command(version)]
#[command(about = "Encrypt, sign and deliver Web Push messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a VAPID key pair and print it (or write it to config.json)
    GenerateKeys {
        /// Save the keys into config.json instead of printing them
        #[arg(long)]
        save: bool,
        /// Contact subject to store alongside the keys
        #[arg(long)]
        subject: Option<String>,
    },
    /// Add a browser subscription (PushSubscription.toJSON() output)
    Subscribe {
        /// Subscription JSON
        json: String,
    },
    /// Remove a subscription by endpoint
    Unsubscribe {
        /// Push service endpoint URL
        endpoint: String,
    },
    /// List active subscriptions
    List,
    /// Deliver a payload to every active subscriber
    Broadcast {
        /// Payload text (usually JSON)
        payload: String,
    },
    /// Deliver a payload to one stored subscriber
    Send {
        /// Push service endpoint URL
        endpoint: String,
        /// Payload text (usually JSON)
        payload: String,
    },
}

fn open_store(config: &Config) -> Result<(Arc<MemorySubscriberStore>, std::path::PathBuf)> {
    let path = config.subscriptions_path()?;
    let store = MemorySubscriberStore::load(&path)?;
    Ok((Arc::new(store), path))
}

fn dispatcher(config: &Config, store: &Arc<MemorySubscriberStore>) -> Result<DeliveryDispatcher> {
    let signer = config.signer()?;
    let store: Arc<dyn SubscriberStore> = Arc::clone(store) as Arc<dyn SubscriberStore>;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(PUSH_REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;
    Ok(DeliveryDispatcher::new(signer, store).with_client(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::GenerateKeys { save, subject } => {
            let keys = VapidKeys::generate();
            let private_key = keys.private_key_base64url()?;
            if save {
                config.vapid_public_key = keys.public_key_base64url().to_string();
                config.vapid_private_key = private_key;
                if let Some(subject) = subject {
                    config.subject = subject;
                }
                config.save()?;
                log::info!("[WebPush] Saved new VAPID keys to {:?}", Config::config_dir()?);
                println!("{}", keys.public_key_base64url());
            } else {
                let out = serde_json::json!({
                    "publicKey": keys.public_key_base64url(),
                    "privateKey": private_key,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
        }
        Commands::Subscribe { json } => {
            let subscriber: Subscriber =
                serde_json::from_str(&json).context("Invalid subscription JSON")?;
            let (store, path) = open_store(&config)?;
            store.upsert(subscriber);
            store.save(&path)?;
        }
        Commands::Unsubscribe { endpoint } => {
            let (store, path) = open_store(&config)?;
            if store.remove(&endpoint) {
                store.save(&path)?;
            } else {
                log::warn!("[WebPush] No subscription for {endpoint}");
            }
        }
        Commands::List => {
            let (store, _) = open_store(&config)?;
            let active = store.list_active().await?;
            println!("{}", serde_json::to_string_pretty(&active)?);
        }
        Commands::Broadcast { payload } => {
            let (store, path) = open_store(&config)?;
            let summary = dispatcher(&config, &store)?
                .broadcast(payload.as_bytes())
                .await?;
            store.save(&path)?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Commands::Send { endpoint, payload } => {
            let (store, path) = open_store(&config)?;
            let outcome = dispatcher(&config, &store)?
                .deliver_to_endpoint(&endpoint, payload.as_bytes())
                .await?;
            store.save(&path)?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
    }

    Ok(())
}
