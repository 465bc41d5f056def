use crate::{PushDelivery, PushMessage, PushNotification, WebpushNotification};
use anyhow::Result;
use linecut_common::time::LocalClock;
use linecut_common::types::{Alert, Notification};
use linecut_store::KeyValueStore;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_WEBPUSH_ASSET: &str = "/static/dashboard/images/logo_linecut_title.png";

pub fn notifications_path(recipient: &str) -> String {
    format!("/notifications/{recipient}")
}

pub fn unread_count_path(recipient: &str) -> String {
    format!("/notifications/{recipient}/unread_count")
}

pub fn tokens_path(recipient: &str) -> String {
    format!("/empresas/{recipient}/fcm_tokens")
}

/// Icon and badge asset paths sent as browser presentation hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebpushAssets {
    pub icon: String,
    pub badge: String,
}

impl Default for WebpushAssets {
    fn default() -> Self {
        Self {
            icon: DEFAULT_WEBPUSH_ASSET.to_string(),
            badge: DEFAULT_WEBPUSH_ASSET.to_string(),
        }
    }
}

/// Result of one [`Notifier::notify`] call. Callers are free to ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Record and counter written; the recipient has no registered devices.
    NoTokens,
    /// Record and counter written; push handed to the delivery provider.
    Delivered {
        success_count: usize,
        failure_count: usize,
    },
    /// Some step failed. Anything written before the failure is kept.
    Failed(String),
}

impl NotifyOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, NotifyOutcome::Failed(_))
    }
}

/// Writes in-app notifications and pushes them to the recipient's devices.
pub struct Notifier {
    store: Arc<dyn KeyValueStore>,
    delivery: Arc<dyn PushDelivery>,
    clock: LocalClock,
    assets: WebpushAssets,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        delivery: Arc<dyn PushDelivery>,
        clock: LocalClock,
    ) -> Self {
        Self {
            store,
            delivery,
            clock,
            assets: WebpushAssets::default(),
        }
    }

    pub fn with_assets(mut self, assets: WebpushAssets) -> Self {
        self.assets = assets;
        self
    }

    /// Records `alert` for `recipient` and pushes it.
    ///
    /// Never fails: errors are logged and reported as
    /// [`NotifyOutcome::Failed`] so that a notification problem cannot abort
    /// the business event that triggered it.
    pub async fn notify(&self, recipient: &str, alert: &Alert) -> NotifyOutcome {
        match self.try_notify(recipient, alert).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(recipient, error = %e, "Failed to send notification");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_notify(&self, recipient: &str, alert: &Alert) -> Result<NotifyOutcome> {
        let now = self.clock.snapshot();
        let record = Notification {
            title: alert.title.clone(),
            body: alert.body.clone(),
            icon: alert.icon.clone(),
            is_read: false,
            timestamp_iso: now.iso(),
            timestamp_display: now.display(),
        };

        let key = self
            .store
            .push(&notifications_path(recipient), serde_json::to_value(&record)?)
            .await
            .map_err(|e| anyhow::anyhow!("append notification: {e}"))?;
        let unread = self
            .store
            .increment(&unread_count_path(recipient), 1)
            .await
            .map_err(|e| anyhow::anyhow!("increment unread counter: {e}"))?;
        tracing::debug!(recipient, key = %key, unread, "Notification recorded");

        let tokens = self
            .store
            .get(&tokens_path(recipient))
            .await
            .map_err(|e| anyhow::anyhow!("read push tokens: {e}"))?
            .map(token_list)
            .unwrap_or_default();
        if tokens.is_empty() {
            tracing::info!(recipient, "Recipient has no push tokens");
            return Ok(NotifyOutcome::NoTokens);
        }

        let message = PushMessage {
            notification: PushNotification {
                title: alert.title.clone(),
                body: alert.body.clone(),
            },
            webpush: WebpushNotification {
                icon: self.assets.icon.clone(),
                badge: self.assets.badge.clone(),
            },
            tokens,
        };
        let response = self.delivery.send_multicast(&message).await?;
        tracing::info!(
            recipient,
            provider = self.delivery.provider_name(),
            success = response.success_count,
            failed = response.failure_count,
            "Push sent"
        );
        Ok(NotifyOutcome::Delivered {
            success_count: response.success_count,
            failure_count: response.failure_count,
        })
    }
}

/// Tokens are the keys of the registration map.
fn token_list(value: Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.into_iter().map(|(token, _)| token).collect(),
        _ => Vec::new(),
    }
}
