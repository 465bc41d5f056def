use crate::plugin::DeliveryPlugin;
use crate::{MulticastResponse, PushDelivery, PushMessage};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Development provider: logs each push and reports every token delivered.
pub struct LogDelivery;

#[async_trait]
impl PushDelivery for LogDelivery {
    async fn send_multicast(&self, message: &PushMessage) -> Result<MulticastResponse> {
        tracing::info!(
            title = %message.notification.title,
            body = %message.notification.body,
            tokens = message.tokens.len(),
            "Push (log provider)"
        );
        Ok(MulticastResponse {
            success_count: message.tokens.len(),
            failure_count: 0,
        })
    }

    fn provider_name(&self) -> &str {
        "log"
    }
}

pub struct LogPlugin;

impl DeliveryPlugin for LogPlugin {
    fn name(&self) -> &str {
        "log"
    }

    fn validate_config(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn create_delivery(&self, _config: &Value) -> Result<Arc<dyn PushDelivery>> {
        Ok(Arc::new(LogDelivery))
    }
}
