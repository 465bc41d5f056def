//! Notification delivery: the in-app record, the unread counter and the
//! multicast push to a recipient's devices.
//!
//! [`notifier::Notifier`] is the single entry point the rules call. Push
//! transport is pluggable through [`PushDelivery`]; built-in providers are
//! FCM (HTTP v1) and a log-only provider for development, both created
//! from configuration by [`plugin::DeliveryRegistry`].

pub mod channels;
pub mod error;
pub mod notifier;
pub mod plugin;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Visible part of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

/// Browser presentation hints (asset paths).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebpushNotification {
    pub icon: String,
    pub badge: String,
}

/// One push addressed to many device tokens at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub notification: PushNotification,
    pub webpush: WebpushNotification,
    pub tokens: Vec<String>,
}

/// Outcome of a multicast call. Per-token failures (stale or revoked
/// tokens) are counted here rather than raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MulticastResponse {
    pub success_count: usize,
    pub failure_count: usize,
}

/// A push transport that delivers one message to many device tokens.
///
/// Implementations are created by the matching [`plugin::DeliveryPlugin`].
#[async_trait]
pub trait PushDelivery: Send + Sync {
    /// Sends `message` to every token in `message.tokens`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the call as a whole could not be made
    /// (e.g. missing credentials); individual token failures are reported
    /// through [`MulticastResponse::failure_count`].
    async fn send_multicast(&self, message: &PushMessage) -> Result<MulticastResponse>;

    /// Provider name (e.g. `"fcm"`, `"log"`).
    fn provider_name(&self) -> &str;
}
