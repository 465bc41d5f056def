use crate::schedule::{day_entry, within_opening_hours};
use crate::{required_param, RuleContext, TriggerHandler};
use anyhow::Result;
use async_trait::async_trait;
use linecut_common::time::LocalNow;
use linecut_common::types::{Alert, STATUS_CLOSED, STATUS_OPEN};
use linecut_store::Change;
use serde_json::Value;

pub const TEMPLATE: &str = "/empresas/{userId}/status";
const ICON: &str = "bi-alarm-fill";

/// Exactly `fechado -> aberto`.
pub fn is_reopening(before: &Value, after: &Value) -> bool {
    before.as_str() == Some(STATUS_CLOSED) && after.as_str() == Some(STATUS_OPEN)
}

/// The alert for a store opened at `now`, or `None` when that is within
/// today's registered hours.
pub fn evaluate(schedule: &Value, now: &LocalNow) -> Option<Alert> {
    let today = day_entry(schedule, now.weekday_key());
    if within_opening_hours(today.as_ref(), &now.hhmm()) {
        return None;
    }
    Some(Alert::new(
        "Alerta de Horário",
        "Sua loja foi aberta, mas parece estar fora do seu horário de funcionamento cadastrado.",
        ICON,
    ))
}

/// Warns a store that was just opened outside its operating schedule.
pub struct StoreReopenedHandler {
    ctx: RuleContext,
}

impl StoreReopenedHandler {
    pub fn new(ctx: RuleContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TriggerHandler for StoreReopenedHandler {
    fn name(&self) -> &str {
        "store_reopened"
    }

    fn template(&self) -> &str {
        TEMPLATE
    }

    async fn on_change(&self, change: &Change) -> Result<()> {
        let (Some(before), Some(after)) = (&change.before, &change.after) else {
            return Ok(());
        };
        if !is_reopening(before, after) {
            return Ok(());
        }
        let user_id = required_param(change, "userId")?;

        let schedule_path = format!("/empresas/{user_id}/horario_funcionamento");
        let Some(schedule) = self.ctx.store.get(&schedule_path).await? else {
            tracing::info!(user_id, "Store opened without a registered schedule");
            return Ok(());
        };

        let now = self.ctx.clock.snapshot();
        if let Some(alert) = evaluate(&schedule, &now) {
            tracing::info!(
                user_id,
                day = now.weekday_key(),
                time = %now.hhmm(),
                "Store opened outside its schedule"
            );
            self.ctx.notifier.notify(user_id, &alert).await;
        }
        Ok(())
    }
}
