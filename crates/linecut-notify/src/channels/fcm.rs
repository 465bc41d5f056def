use crate::error::NotifyError;
use crate::plugin::DeliveryPlugin;
use crate::{MulticastResponse, PushDelivery, PushMessage};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "https://fcm.googleapis.com/v1/projects/{project_id}/messages:send";
const DEFAULT_TOKEN_ENV: &str = "FCM_ACCESS_TOKEN";
const MAX_ERROR_BODY: usize = 500;

/// Firebase Cloud Messaging over the HTTP v1 API.
///
/// The v1 API addresses one token per request, so a multicast is one
/// request per token, sent concurrently.
pub struct FcmDelivery {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl FcmDelivery {
    pub fn new(endpoint: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            access_token,
        }
    }

    fn request_body(message: &PushMessage, token: &str) -> Value {
        json!({
            "message": {
                "token": token,
                "notification": {
                    "title": message.notification.title,
                    "body": message.notification.body,
                },
                "webpush": {
                    "notification": {
                        "icon": message.webpush.icon,
                        "badge": message.webpush.badge,
                    }
                }
            }
        })
    }

    async fn send_one(&self, body: Value) -> crate::error::Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("[Failed to read response body: {e}]"));
        Err(NotifyError::ApiError {
            service: "fcm".to_string(),
            status: status.as_u16(),
            body: truncate(&text, MAX_ERROR_BODY),
        })
    }
}

#[async_trait]
impl PushDelivery for FcmDelivery {
    async fn send_multicast(&self, message: &PushMessage) -> Result<MulticastResponse> {
        let sends = message
            .tokens
            .iter()
            .map(|token| self.send_one(Self::request_body(message, token)));
        let results = join_all(sends).await;

        let mut response = MulticastResponse::default();
        for (token, result) in message.tokens.iter().zip(results) {
            match result {
                Ok(()) => response.success_count += 1,
                Err(e) => {
                    response.failure_count += 1;
                    tracing::warn!(token = %token_hint(token), error = %e, "FCM delivery failed");
                }
            }
        }
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "fcm"
    }
}

/// First characters of a token, enough to correlate log lines.
fn token_hint(token: &str) -> String {
    let hint: String = token.chars().take(12).collect();
    format!("{hint}…")
}

/// Truncates on a char boundary.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

// Plugin

#[derive(Deserialize)]
struct FcmConfig {
    project_id: String,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    access_token_env: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
}

impl FcmConfig {
    fn parse(config: &Value) -> Result<Self> {
        let cfg: Self = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("fcm: {e}")))?;
        if cfg.project_id.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("fcm: project_id is empty".to_string()).into());
        }
        Ok(cfg)
    }

    /// Explicit token first, then the configured (or default) env var.
    fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
        let var = self.access_token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV);
        std::env::var(var).map_err(|_| {
            NotifyError::InvalidConfig(format!("fcm: no access_token and ${var} is not set")).into()
        })
    }

    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.replace("{project_id}", &self.project_id))
    }
}

pub struct FcmPlugin;

impl DeliveryPlugin for FcmPlugin {
    fn name(&self) -> &str {
        "fcm"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        FcmConfig::parse(config).map(|_| ())
    }

    fn create_delivery(&self, config: &Value) -> Result<Arc<dyn PushDelivery>> {
        let cfg = FcmConfig::parse(config)?;
        let token = cfg.resolve_token()?;
        Ok(Arc::new(FcmDelivery::new(cfg.endpoint(), token)))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(token) = redacted.get_mut("access_token") {
            *token = Value::String("***".to_string());
        }
        redacted
    }
}
