use crate::{required_param, RuleContext, TriggerHandler};
use anyhow::Result;
use async_trait::async_trait;
use linecut_common::types::{Alert, ORDER_CANCELLED};
use linecut_store::Change;
use serde_json::Value;

pub const TEMPLATE: &str = "/pedidos_por_lanchonete/{lanchoneteId}/{orderId}";

/// Reason written when the restaurant itself cancelled; that path already
/// notified the store, so nothing is sent here.
pub const RESTAURANT_CANCEL_REASON: &str = "Cancelado pelo restaurante";
pub const DEFAULT_REASON: &str = "Motivo não informado";
const ICON: &str = "bi-x-circle-fill";

fn status(order: &Value) -> Option<&str> {
    order.get("status").and_then(Value::as_str)
}

/// A transition into `cancelado` from any other status.
pub fn is_cancellation(before: &Value, after: &Value) -> bool {
    status(before) != Some(ORDER_CANCELLED) && status(after) == Some(ORDER_CANCELLED)
}

/// The alert for a cancelled order, or `None` when the restaurant cancelled it.
pub fn evaluate(order_id: &str, reason: &str) -> Option<Alert> {
    if reason == RESTAURANT_CANCEL_REASON {
        return None;
    }
    Some(Alert::new(
        format!("Pedido #{} Cancelado", last_chars(order_id, 8)),
        format!("O pedido foi cancelado pelo cliente. Motivo: {reason}"),
        ICON,
    ))
}

fn last_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    s.char_indices()
        .rev()
        .nth(n - 1)
        .map_or(s, |(idx, _)| &s[idx..])
}

fn reason_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Notifies a store when a client cancels one of its orders.
pub struct OrderCancelledHandler {
    ctx: RuleContext,
}

impl OrderCancelledHandler {
    pub fn new(ctx: RuleContext) -> Self {
        Self { ctx }
    }

    async fn cancellation_reason(&self, order_id: &str) -> String {
        let path = format!("/pedidos/{order_id}/motivo_cancelamento");
        match self.ctx.store.get(&path).await {
            Ok(Some(value)) => reason_text(value),
            Ok(None) => DEFAULT_REASON.to_string(),
            Err(e) => {
                tracing::info!(order_id, error = %e, "Cancellation reason lookup failed");
                DEFAULT_REASON.to_string()
            }
        }
    }
}

#[async_trait]
impl TriggerHandler for OrderCancelledHandler {
    fn name(&self) -> &str {
        "order_cancelled"
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    async fn on_change(&self, change: &Change) -> Result<()> {
        let (Some(before), Some(after)) = (&change.before, &change.after) else {
            return Ok(());
        };
        if !is_cancellation(before, after) {
            return Ok(());
        }
        let store_id = required_param(change, "lanchoneteId")?;
        let order_id = required_param(change, "orderId")?;

        let reason = self.cancellation_reason(order_id).await;
        match evaluate(order_id, &reason) {
            Some(alert) => {
                self.ctx.notifier.notify(store_id, &alert).await;
            }
            None => {
                tracing::info!(order_id, "Order cancelled by the restaurant, not notifying");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_chars_handles_short_and_multibyte_ids() {
        assert_eq!(last_chars("-NabcdefGHIJKLMN", 8), "GHIJKLMN");
        assert_eq!(last_chars("abc", 8), "abc");
        assert_eq!(last_chars("pedidoçãoé", 3), "ãoé");
        assert_eq!(last_chars("abc", 0), "");
    }

    #[test]
    fn non_string_reason_is_rendered_as_json() {
        assert_eq!(reason_text(Value::from(42)), "42");
        assert_eq!(reason_text(Value::from("Demora")), "Demora");
    }
}
