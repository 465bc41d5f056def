use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::fmt::Write;
use std::time::Instant;

/// Per-request trace id, stored in request extensions and echoed back in
/// the `X-Trace-Id` response header.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// 16 hex characters from 8 random bytes.
fn new_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    bytes.iter().fold(String::with_capacity(16), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

const MAX_LOGGED_BODY: usize = 200;
const MAX_REQUEST_BODY: usize = 1024 * 1024;

fn body_snippet(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > MAX_LOGGED_BODY => {
            let mut end = MAX_LOGGED_BODY;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Logs every request and response with a shared trace id. Health checks
/// get the trace id but are not logged.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = new_trace_id();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    if req.uri().path() == "/health" {
        return with_trace_header(next.run(req).await, &trace_id);
    }

    let method = req.method().clone();
    let uri = req.uri().to_string();

    let (req, request_body) = if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, MAX_REQUEST_BODY)
            .await
            .unwrap_or_default();
        let snippet = body_snippet(&bytes);
        (Request::from_parts(parts, Body::from(bytes)), snippet)
    } else {
        (req, String::new())
    };
    tracing::info!(
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        body = %request_body,
        "--> request"
    );

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let (parts, body) = response.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let response_body = if is_json(&parts.headers) {
        body_snippet(&bytes)
    } else {
        String::new()
    };

    let status = parts.status.as_u16();
    if parts.status.is_server_error() {
        tracing::error!(trace_id = %trace_id, status, elapsed_ms, body = %response_body, "<-- response");
    } else if parts.status.is_client_error() {
        tracing::warn!(trace_id = %trace_id, status, elapsed_ms, body = %response_body, "<-- response");
    } else {
        tracing::info!(trace_id = %trace_id, status, elapsed_ms, "<-- response");
    }

    with_trace_header(Response::from_parts(parts, Body::from(bytes)), &trace_id)
}

fn with_trace_header(mut response: Response, trace_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        response.headers_mut().insert("X-Trace-Id", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_ids_are_sixteen_hex_chars() {
        let id = new_trace_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let snippet = body_snippet(long.as_bytes());
        assert!(snippet.ends_with("..."));
        assert!(snippet.len() <= MAX_LOGGED_BODY + 3);
        assert_eq!(body_snippet(b"{\"a\":1}"), "{\"a\":1}");
    }
}
