mod common;

use axum::http::StatusCode;
use common::{build_test_context, request_json, sao_paulo};
use linecut_store::KeyValueStore;
use serde_json::json;

#[tokio::test]
async fn health_reports_ok_with_trace_id() {
    let ctx = build_test_context(json!({}), sao_paulo(3, 12, 0)).unwrap();
    let (status, body, trace_id) = request_json(&ctx.app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);
    assert_eq!(body["data"]["storage_status"], "ok");
    assert_eq!(body["data"]["timezone"], "America/Sao_Paulo");
    let trace_id = trace_id.expect("trace id header");
    assert_eq!(body["trace_id"], trace_id.as_str());
}

#[tokio::test]
async fn put_then_get_round_trips() {
    let ctx = build_test_context(json!({}), sao_paulo(3, 12, 0)).unwrap();

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        "/v1/data/restaurants/r1/products/p1",
        Some(json!({"name": "Pastel", "quantity": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);

    let (status, body, _) =
        request_json(&ctx.app, "GET", "/v1/data/restaurants/r1/products/p1/name", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Pastel");
}

#[tokio::test]
async fn get_missing_path_returns_null() {
    let ctx = build_test_context(json!({}), sao_paulo(3, 12, 0)).unwrap();
    let (status, body, _) = request_json(&ctx.app, "GET", "/v1/data/nothing/here", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn patch_merges_children() {
    let ctx = build_test_context(
        json!({"empresas": {"loja": {"status": "fechado", "nome": "Cantina"}}}),
        sao_paulo(3, 12, 0),
    )
    .unwrap();

    let (status, _, _) = request_json(
        &ctx.app,
        "PATCH",
        "/v1/data/empresas/loja",
        Some(json!({"nome": "Cantina Central", "telefone": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ctx.store.get("/empresas/loja").await.unwrap(),
        Some(json!({"status": "fechado", "nome": "Cantina Central"}))
    );
}

#[tokio::test]
async fn patch_rejects_non_object_body() {
    let ctx = build_test_context(json!({}), sao_paulo(3, 12, 0)).unwrap();
    let (status, body, _) =
        request_json(&ctx.app, "PATCH", "/v1/data/empresas/loja", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1001);
}

#[tokio::test]
async fn post_appends_under_ordered_keys() {
    let ctx = build_test_context(json!({}), sao_paulo(3, 12, 0)).unwrap();

    let mut keys = Vec::new();
    for n in 0..3 {
        let (status, body, _) =
            request_json(&ctx.app, "POST", "/v1/data/logs", Some(json!({"n": n}))).await;
        assert_eq!(status, StatusCode::CREATED);
        keys.push(body["data"]["key"].as_str().unwrap().to_string());
    }

    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    let logs = ctx.store.get("/logs").await.unwrap().unwrap();
    assert_eq!(logs.as_object().unwrap().len(), 3);
    assert_eq!(logs[&keys[2]]["n"], 2);
}

#[tokio::test]
async fn put_null_deletes() {
    let ctx = build_test_context(json!({"a": {"b": 1, "c": 2}}), sao_paulo(3, 12, 0)).unwrap();
    let (status, _, _) = request_json(&ctx.app, "PUT", "/v1/data/a/b", Some(json!(null))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.store.get("/a").await.unwrap(), Some(json!({"c": 2})));
}

#[tokio::test]
async fn reserved_characters_are_rejected() {
    let ctx = build_test_context(json!({}), sao_paulo(3, 12, 0)).unwrap();
    let (status, body, _) =
        request_json(&ctx.app, "PUT", "/v1/data/empresas/a.b", Some(json!(1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1201);
}
