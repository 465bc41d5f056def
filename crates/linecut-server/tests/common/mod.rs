#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use linecut_common::time::FixedClock;
use linecut_server::app;
use linecut_server::config::ServerConfig;
use linecut_server::registry::RunningTriggers;
use linecut_server::services::Services;
use linecut_server::state::AppState;
use linecut_store::memory::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub services: Services,
    pub triggers: RunningTriggers,
}

/// Local São Paulo time on a day of June 2024 (the 3rd is a Monday).
pub fn sao_paulo(day: u32, hour: i64, minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap() + Duration::minutes((hour + 3) * 60 + minute)
}

/// Full server wiring over a seeded in-memory tree, with triggers running
/// and the clock pinned to `now`.
pub fn build_test_context(seed: Value, now: DateTime<Utc>) -> Result<TestContext> {
    linecut_common::id::init(1, 1);

    let config = ServerConfig::default();
    let store = Arc::new(MemoryStore::from_value(seed)?);
    let clock = Arc::new(FixedClock::new(now));
    let services = Services::build(&config, store.clone(), clock.clone())?;
    let triggers = services.triggers.start(store.as_ref())?;

    let state = AppState::new(store.clone(), Arc::new(config));
    let app = app::build_http_app(state);

    Ok(TestContext {
        app,
        store,
        clock,
        services,
        triggers,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => {
            builder = builder.header("Content-Type", "application/json");
            builder.body(Body::from(body.to_string()))
        }
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

/// Notification records stored for `recipient`, in key order.
pub fn notifications(store: &MemoryStore, recipient: &str) -> Vec<Value> {
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

/// Polls until `recipient` has `count` notifications, failing after a few
/// seconds. Triggers run on their own tasks, so results appear asynchronously.
pub async fn wait_for_notifications(store: &MemoryStore, recipient: &str, count: usize) -> Vec<Value> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let found = notifications(store, recipient);
        if found.len() >= count {
            return found;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {count} notifications for {recipient}, found {}",
            found.len()
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Gives spawned trigger tasks a chance to run, for asserting that nothing happened.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
