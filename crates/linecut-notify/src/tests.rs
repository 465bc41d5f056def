use crate::notifier::{Notifier, NotifyOutcome, WebpushAssets};
use crate::plugin::DeliveryRegistry;
use crate::{MulticastResponse, PushDelivery, PushMessage};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use linecut_common::time::{FixedClock, LocalClock, DEFAULT_TIMEZONE};
use linecut_common::types::Alert;
use linecut_store::memory::MemoryStore;
use linecut_store::KeyValueStore;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingDelivery {
    sent: Mutex<Vec<PushMessage>>,
}

#[async_trait]
impl PushDelivery for RecordingDelivery {
    async fn send_multicast(&self, message: &PushMessage) -> Result<MulticastResponse> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(MulticastResponse {
            success_count: message.tokens.len(),
            failure_count: 0,
        })
    }

    fn provider_name(&self) -> &str {
        "recording"
    }
}

struct FailingDelivery;

#[async_trait]
impl PushDelivery for FailingDelivery {
    async fn send_multicast(&self, _message: &PushMessage) -> Result<MulticastResponse> {
        anyhow::bail!("push service unavailable")
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

fn clock() -> LocalClock {
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 15, 42, 0).unwrap();
    LocalClock::new(Arc::new(FixedClock::new(now)), DEFAULT_TIMEZONE)
}

fn setup(delivery: Arc<dyn PushDelivery>) -> (Arc<MemoryStore>, Notifier) {
    let store = Arc::new(
        MemoryStore::from_value(json!({
            "empresas": {
                "loja-1": {"fcm_tokens": {"tok-a": true, "tok-b": true}},
                "loja-2": {"status": "aberto"}
            }
        }))
        .unwrap(),
    );
    let notifier = Notifier::new(store.clone(), delivery, clock());
    (store, notifier)
}

fn records(store: &MemoryStore, recipient: &str) -> Vec<Value> {
    store.to_value()["notifications"][recipient]
        .as_object()
        .map(|m| {
            m.iter()
                .filter(|(k, _)| k.as_str() != "unread_count")
                .map(|(_, v)| v.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn notify_records_counts_and_pushes() {
    let delivery = Arc::new(RecordingDelivery::default());
    let (store, notifier) = setup(delivery.clone());

    let outcome = notifier
        .notify("loja-1", &Alert::new("Estoque Crítico", "corpo", "bi-exclamation-triangle-fill"))
        .await;

    assert_eq!(
        outcome,
        NotifyOutcome::Delivered {
            success_count: 2,
            failure_count: 0
        }
    );
    let saved = records(&store, "loja-1");
    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0],
        json!({
            "title": "Estoque Crítico",
            "body": "corpo",
            "icon": "bi-exclamation-triangle-fill",
            "is_read": false,
            "timestamp_iso": "2024-05-10T15:42:00.000Z",
            "timestamp_display": "10/05/2024 às 12:42",
        })
    );
    assert_eq!(
        store.get("/notifications/loja-1/unread_count").await.unwrap(),
        Some(json!(1))
    );

    let sent = delivery.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tokens, vec!["tok-a", "tok-b"]);
    assert_eq!(sent[0].notification.title, "Estoque Crítico");
    assert_eq!(sent[0].webpush, {
        let assets = WebpushAssets::default();
        crate::WebpushNotification {
            icon: assets.icon,
            badge: assets.badge,
        }
    });
}

#[tokio::test]
async fn notify_without_tokens_still_records() {
    let delivery = Arc::new(RecordingDelivery::default());
    let (store, notifier) = setup(delivery.clone());

    let outcome = notifier.notify("loja-2", &Alert::info("Olá", "mundo")).await;

    assert_eq!(outcome, NotifyOutcome::NoTokens);
    let saved = records(&store, "loja-2");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["icon"], "bi-info-circle");
    assert_eq!(
        store.get("/notifications/loja-2/unread_count").await.unwrap(),
        Some(json!(1))
    );
    assert!(delivery.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delivery_failure_is_swallowed_and_record_kept() {
    let (store, notifier) = setup(Arc::new(FailingDelivery));

    let outcome = notifier.notify("loja-1", &Alert::info("t", "b")).await;

    assert!(outcome.is_failed());
    assert_eq!(records(&store, "loja-1").len(), 1);
    assert_eq!(
        store.get("/notifications/loja-1/unread_count").await.unwrap(),
        Some(json!(1))
    );
}

#[tokio::test]
async fn custom_assets_are_sent() {
    let delivery = Arc::new(RecordingDelivery::default());
    let (_store, notifier) = setup(delivery.clone());
    let notifier = notifier.with_assets(WebpushAssets {
        icon: "/icon.png".into(),
        badge: "/badge.png".into(),
    });

    notifier.notify("loja-1", &Alert::info("t", "b")).await;

    let sent = delivery.sent.lock().unwrap();
    assert_eq!(sent[0].webpush.icon, "/icon.png");
    assert_eq!(sent[0].webpush.badge, "/badge.png");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_notifies_keep_every_record_and_count() {
    let delivery = Arc::new(RecordingDelivery::default());
    let (store, notifier) = setup(delivery.clone());
    let notifier = Arc::new(notifier);

    let tasks: Vec<_> = (0..40)
        .map(|i| {
            let notifier = notifier.clone();
            tokio::spawn(async move {
                notifier
                    .notify("loja-1", &Alert::info(format!("n{i}"), "b"))
                    .await
            })
        })
        .collect();
    for outcome in futures::future::join_all(tasks).await {
        assert!(!outcome.unwrap().is_failed());
    }

    assert_eq!(records(&store, "loja-1").len(), 40);
    assert_eq!(
        store.get("/notifications/loja-1/unread_count").await.unwrap(),
        Some(json!(40))
    );
    assert_eq!(delivery.sent.lock().unwrap().len(), 40);
}

#[tokio::test]
async fn sequential_notifies_are_listed_in_order() {
    let (store, notifier) = setup(Arc::new(RecordingDelivery::default()));
    for i in 0..5 {
        notifier.notify("loja-2", &Alert::info(format!("n{i}"), "b")).await;
    }
    let titles: Vec<String> = records(&store, "loja-2")
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["n0", "n1", "n2", "n3", "n4"]);
}

// ── Delivery registry ──

#[test]
fn registry_default_has_builtin_providers() {
    let registry = DeliveryRegistry::default();
    let mut names = registry.plugin_names();
    names.sort();
    assert_eq!(names, vec!["fcm", "log"]);
}

#[test]
fn registry_unknown_provider_returns_error() {
    let registry = DeliveryRegistry::default();
    let err = registry
        .create_delivery("pigeon", &json!({}))
        .err()
        .expect("unknown provider should fail");
    assert!(err.to_string().contains("unknown push provider"), "error was: {err}");
}

#[test]
fn fcm_provider_validates_config() {
    let registry = DeliveryRegistry::default();
    assert!(registry.create_delivery("fcm", &json!({})).is_err());
    assert!(registry
        .create_delivery("fcm", &json!({"project_id": "  "}))
        .is_err());
    let delivery = registry
        .create_delivery("fcm", &json!({"project_id": "p", "access_token": "tok"}))
        .unwrap();
    assert_eq!(delivery.provider_name(), "fcm");
}

#[test]
fn fcm_config_is_redacted_for_logs() {
    let registry = DeliveryRegistry::default();
    let redacted =
        registry.redact_config("fcm", &json!({"project_id": "p", "access_token": "secret"}));
    assert_eq!(redacted["access_token"], "***");
    assert_eq!(redacted["project_id"], "p");
}

#[tokio::test]
async fn log_provider_reports_every_token_delivered() {
    let registry = DeliveryRegistry::default();
    let delivery = registry.create_delivery("log", &json!({})).unwrap();
    let response = delivery
        .send_multicast(&PushMessage {
            notification: crate::PushNotification {
                title: "t".into(),
                body: "b".into(),
            },
            webpush: crate::WebpushNotification {
                icon: "i".into(),
                badge: "b".into(),
            },
            tokens: vec!["a".into(), "b".into(), "c".into()],
        })
        .await
        .unwrap();
    assert_eq!(response.success_count, 3);
}
