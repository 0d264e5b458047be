//! Integration tests for web push delivery against a mock push service.
//!
//! These tests verify request shape, outcome classification, store side
//! effects and fan-out isolation.

// Rust guideline compliant 2026-02

use async_trait::async_trait;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use std::sync::{Arc, Mutex};
use webpush_dispatch::codec;
use webpush_dispatch::notifications::ece;
use webpush_dispatch::notifications::primitives::FixedCrypto;
use webpush_dispatch::{
    DeliveryDispatcher, DeliverySummary, MemorySubscriberStore, Subscriber, SubscriberKeys,
    SubscriberStore, VapidKeys, VapidSigner,
};
use wiremock::matchers::{header, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTH: [u8; 16] = [0x42; 16];

/// Store wrapper that records every deactivation.
#[derive(Debug, Default)]
struct RecordingStore {
    inner: MemorySubscriberStore,
    deactivated: Mutex<Vec<String>>,
}

#[async_trait]
impl SubscriberStore for RecordingStore {
    async fn list_active(&self) -> anyhow::Result<Vec<Subscriber>> {
        self.inner.list_active().await
    }

    async fn get_by_endpoint(&self, endpoint: &str) -> anyhow::Result<Option<Subscriber>> {
        self.inner.get_by_endpoint(endpoint).await
    }

    async fn deactivate(&self, endpoint: &str) -> anyhow::Result<()> {
        self.deactivated.lock().unwrap().push(endpoint.to_string());
        self.inner.deactivate(endpoint).await
    }
}

/// Store whose backend is unreachable.
#[derive(Debug)]
struct BrokenStore;

#[async_trait]
impl SubscriberStore for BrokenStore {
    async fn list_active(&self) -> anyhow::Result<Vec<Subscriber>> {
        anyhow::bail!("connection refused")
    }

    async fn get_by_endpoint(&self, _endpoint: &str) -> anyhow::Result<Option<Subscriber>> {
        anyhow::bail!("connection refused")
    }

    async fn deactivate(&self, _endpoint: &str) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
}

/// Helper to create a subscriber with a real receiver key pair.
fn subscriber(endpoint: String) -> (Subscriber, SecretKey) {
    let receiver = SecretKey::random(&mut OsRng);
    let sub = Subscriber {
        endpoint,
        expiration_time: None,
        keys: SubscriberKeys {
            p256dh: codec::encode(receiver.public_key().to_encoded_point(false).as_bytes()),
            auth: codec::encode(AUTH),
        },
    };
    (sub, receiver)
}

fn signer() -> VapidSigner {
    VapidSigner::new(VapidKeys::generate(), "ops@example.com")
}

#[tokio::test]
async fn test_deliver_one_sends_rfc8030_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/abc"))
        .and(header("TTL", "86400"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(header("Content-Encoding", "aes128gcm"))
        .and(header("Urgency", "normal"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySubscriberStore::new());
    let signer = signer();
    let public_key = signer.keys().public_key_base64url().to_string();
    let dispatcher = DeliveryDispatcher::new(signer, store);
    let (sub, receiver) = subscriber(format!("{}/push/abc", server.uri()));

    let payload = br#"{"title":"Build finished","body":"main is green"}"#;
    let outcome = dispatcher.deliver_one(&sub, payload).await;
    assert!(outcome.success, "{}", outcome.detail);
    assert_eq!(outcome.status_code, 201);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    // Body opens with the subscriber's key and yields the payload
    let opened = ece::decrypt(&request.body, &receiver, &AUTH).expect("decrypt body");
    assert_eq!(opened, payload);

    // Authorization: vapid t=<jwt>, k=<public key>
    let authorization = request
        .headers
        .get("authorization")
        .expect("authorization header")
        .to_str()
        .expect("ascii");
    let rest = authorization.strip_prefix("vapid t=").expect("vapid scheme");
    let (jwt, k) = rest.split_once(", k=").expect("k parameter");
    assert_eq!(k, public_key);

    let claims_b64 = jwt.split('.').nth(1).expect("claims segment");
    let claims: serde_json::Value =
        serde_json::from_slice(&codec::decode(claims_b64).expect("b64")).expect("json");
    assert_eq!(claims["aud"], server.uri());
    assert_eq!(claims["sub"], "mailto:ops@example.com");
}

#[tokio::test]
async fn test_injected_crypto_makes_body_deterministic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/fixed"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let crypto = FixedCrypto::new(&[0x11; 32], [0x22; 16]).expect("fixed crypto");
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("client");
    let dispatcher = DeliveryDispatcher::new(signer(), Arc::new(MemorySubscriberStore::new()))
        .with_client(client)
        .with_crypto(Arc::new(crypto.clone()));
    let (sub, _) = subscriber(format!("{}/push/fixed", server.uri()));

    let payload = b"deterministic";
    let outcome = dispatcher.deliver_one(&sub, payload).await;
    assert!(outcome.success, "{}", outcome.detail);

    let expected = ece::encrypt(&crypto, payload, &sub).expect("encrypt");
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, expected.into_bytes());
}

#[tokio::test]
async fn test_fan_out_isolates_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("^/push/[124]$"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/push/3"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let mut subscribers = Vec::new();
    for i in 1..=4 {
        subscribers.push(subscriber(format!("{}/push/{i}", server.uri())).0);
    }
    // Nothing listens on port 1: connection refused
    subscribers.push(subscriber("http://127.0.0.1:1/push/5".to_string()).0);

    let store = Arc::new(RecordingStore::default());
    for sub in &subscribers {
        store.inner.upsert(sub.clone());
    }
    let dispatcher = DeliveryDispatcher::new(signer(), Arc::clone(&store) as Arc<dyn SubscriberStore>);

    let summary = dispatcher.deliver_all(subscribers, b"hello").await;
    assert_eq!(summary, DeliverySummary { sent: 3, failed: 2 });

    let deactivated = store.deactivated.lock().unwrap().clone();
    assert_eq!(deactivated, vec![format!("{}/push/3", server.uri())]);
    assert!(!store.inner.is_active(&format!("{}/push/3", server.uri())));
    assert!(store.inner.is_active("http://127.0.0.1:1/push/5"));
}

#[tokio::test]
async fn test_rejection_is_failed_without_deactivation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413).set_body_string("payload too large"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let (sub, _) = subscriber(format!("{}/push/big", server.uri()));
    store.inner.upsert(sub.clone());
    let dispatcher = DeliveryDispatcher::new(signer(), Arc::clone(&store) as Arc<dyn SubscriberStore>);

    let outcome = dispatcher.deliver_one(&sub, b"x").await;
    assert!(!outcome.success);
    assert_eq!(outcome.status_code, 413);
    assert!(outcome.detail.contains("payload too large"), "{}", outcome.detail);
    assert!(store.deactivated.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_gone_deactivates_and_reports_410() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySubscriberStore::new());
    let (sub, _) = subscriber(format!("{}/push/old", server.uri()));
    store.upsert(sub.clone());
    let dispatcher = DeliveryDispatcher::new(signer(), Arc::clone(&store) as Arc<dyn SubscriberStore>);

    let outcome = dispatcher
        .deliver_to_endpoint(&sub.endpoint, b"x")
        .await
        .expect("store lookup");
    assert!(!outcome.success);
    assert_eq!(outcome.status_code, 410);
    assert!(!store.is_active(&sub.endpoint));

    // A deactivated subscriber is no longer addressable
    let again = dispatcher
        .deliver_to_endpoint(&sub.endpoint, b"x")
        .await
        .expect("store lookup");
    assert_eq!(again.status_code, 404);
}

#[tokio::test]
async fn test_unknown_endpoint_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySubscriberStore::new());
    let dispatcher = DeliveryDispatcher::new(signer(), store);

    let outcome = dispatcher
        .deliver_to_endpoint(&format!("{}/push/nobody", server.uri()), b"x")
        .await
        .expect("store lookup");
    assert!(!outcome.success);
    assert_eq!(outcome.status_code, 404);
    assert_eq!(outcome.detail, "not found");
    assert!(server.received_requests().await.expect("recording").is_empty());
}

#[tokio::test]
async fn test_broadcast_uses_active_subscribers_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySubscriberStore::new());
    for i in 1..=3 {
        store.upsert(subscriber(format!("{}/push/{i}", server.uri())).0);
    }
    store
        .deactivate(&format!("{}/push/2", server.uri()))
        .await
        .expect("deactivate");
    let dispatcher = DeliveryDispatcher::new(signer(), Arc::clone(&store) as Arc<dyn SubscriberStore>);

    let summary = dispatcher.broadcast(b"hello").await.expect("broadcast");
    assert_eq!(summary, DeliverySummary { sent: 2, failed: 0 });
}

#[tokio::test]
async fn test_broadcast_surfaces_store_failure() {
    let dispatcher = DeliveryDispatcher::new(signer(), Arc::new(BrokenStore));
    let err = dispatcher.broadcast(b"hello").await.unwrap_err();
    assert!(format!("{err:#}").contains("connection refused"));

    assert!(dispatcher
        .deliver_to_endpoint("https://push.example.com/1", b"x")
        .await
        .is_err());
}
