//! HTTP surface: health plus read/write access to the store tree.
//!
//! Writes go through the same [`KeyValueStore`] the triggers watch, so a
//! `PUT /v1/data/empresas/abc/status` fires the store-status rule exactly
//! like any other writer would.

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use linecut_store::error::StoreError;
use linecut_store::KeyValueStore;
use serde::Serialize;
use serde_json::Value;

/// Uniform response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success.
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "invalid_path" => 1201,
        "internal_error" => 1500,
        "storage_error" => 1501,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Maps a store failure to a response: malformed paths are the caller's
/// fault, anything else is ours.
fn store_error_response(trace_id: &str, err: &anyhow::Error) -> Response {
    match err.downcast_ref::<StoreError>() {
        Some(StoreError::InvalidPath(_)) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "invalid_path", &err.to_string())
        }
        _ => {
            tracing::error!(trace_id, error = %err, "Store operation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "store operation failed",
            )
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    timezone: String,
    storage_status: String,
}

async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state.store.ping().await {
        Ok(_) => "ok",
        Err(_) => "error",
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            timezone: state.config.timezone.clone(),
            storage_status: storage_status.to_string(),
        },
    )
}

/// Value at the path, or `null` when nothing is stored there.
async fn read_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    match state.store.get(&path).await {
        Ok(value) => success_response(StatusCode::OK, &trace_id, value),
        Err(e) => store_error_response(&trace_id, &e),
    }
}

/// Replaces the value at the path; a `null` body deletes it.
async fn set_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> Response {
    match state.store.set(&path, value).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "success"),
        Err(e) => store_error_response(&trace_id, &e),
    }
}

/// Merges the children of a JSON object body into the value at the path.
async fn update_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> Response {
    let Value::Object(fields) = value else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "update body must be a JSON object",
        );
    };
    match state.store.update(&path, fields).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "success"),
        Err(e) => store_error_response(&trace_id, &e),
    }
}

#[derive(Serialize)]
struct PushResponse {
    key: String,
}

/// Appends the body under a new time-ordered key.
async fn push_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> Response {
    if value.is_null() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "cannot push a null value",
        );
    }
    match state.store.push(&path, value).await {
        Ok(key) => success_response(StatusCode::CREATED, &trace_id, PushResponse { key }),
        Err(e) => store_error_response(&trace_id, &e),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health)).route(
        "/v1/data/{*path}",
        get(read_data)
            .put(set_data)
            .patch(update_data)
            .post(push_data),
    )
}
