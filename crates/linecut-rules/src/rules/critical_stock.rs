use crate::{required_param, RuleContext, TriggerHandler};
use anyhow::Result;
use async_trait::async_trait;
use linecut_common::types::Alert;
use linecut_store::Change;
use serde_json::Value;

pub const TEMPLATE: &str = "/restaurants/{restaurantId}/products/{productId}/quantity";
pub const DEFAULT_PRODUCT_NAME: &str = "Produto";
const ICON: &str = "bi-exclamation-triangle-fill";

/// A decrease that moves the quantity from above the threshold to at or below it.
pub fn crosses_critical(before: f64, after: f64, critical: f64) -> bool {
    after < before && after <= critical && before > critical
}

/// The product's `critical_quantity`. Zero or a non-numeric value means no
/// threshold is configured.
pub fn critical_threshold(product: &Value) -> Option<f64> {
    product
        .get("critical_quantity")
        .and_then(Value::as_f64)
        .filter(|c| *c != 0.0)
}

/// The alert for a quantity change of `product`, if it crosses the threshold.
///
/// Either side being non-numeric (including a deleted quantity) is ignored.
pub fn evaluate(product: &Value, before: &Value, after: &Value) -> Option<Alert> {
    let before_qty = before.as_f64()?;
    let after_qty = after.as_f64()?;
    let critical = critical_threshold(product)?;
    if !crosses_critical(before_qty, after_qty, critical) {
        return None;
    }
    let name = product
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_PRODUCT_NAME);
    Some(Alert::new(
        "Estoque Crítico",
        format!("O estoque de '{name}' atingiu o nível crítico ({after_qty} unidades)."),
        ICON,
    ))
}

/// Notifies a restaurant when a product's stock drops to its critical level.
pub struct CriticalStockHandler {
    ctx: RuleContext,
}

impl CriticalStockHandler {
    pub fn new(ctx: RuleContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TriggerHandler for CriticalStockHandler {
    fn name(&self) -> &str {
        "critical_stock"
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    async fn on_change(&self, change: &Change) -> Result<()> {
        let (Some(before), Some(after)) = (&change.before, &change.after) else {
            return Ok(());
        };
        let restaurant_id = required_param(change, "restaurantId")?;
        let product_id = required_param(change, "productId")?;

        let product_path = format!("/restaurants/{restaurant_id}/products/{product_id}");
        let Some(product) = self.ctx.store.get(&product_path).await? else {
            return Ok(());
        };
        if let Some(alert) = evaluate(&product, before, after) {
            tracing::info!(restaurant_id, product_id, quantity = %after, "Stock reached critical level");
            self.ctx.notifier.notify(restaurant_id, &alert).await;
        }
        Ok(())
    }
}
