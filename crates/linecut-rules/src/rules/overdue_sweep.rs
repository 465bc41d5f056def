use crate::schedule::{day_entry, is_past_closing};
use crate::{RuleContext, ScheduledJob};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use linecut_common::time::{local_date_of, LocalNow};
use linecut_common::types::{Alert, STATUS_OPEN};
use serde_json::{Map, Value};

pub const WATERMARK_FIELD: &str = "lastOverdueWarningSent";
const ICON: &str = "bi-alarm-fill";

/// Summary of one sweep, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stores whose status is `aberto`.
    pub open: usize,
    /// Open stores past today's closing time and not yet warned today.
    pub overdue: usize,
    /// Overdue stores whose notification did not fail.
    pub notified: usize,
}

/// Whether a warning was already sent on the local calendar day of `now`.
///
/// A missing or unparsable watermark counts as a different day.
pub fn warned_today(watermark: Option<&str>, now: &LocalNow) -> bool {
    watermark
        .and_then(|w| local_date_of(w, now.local.timezone()))
        .is_some_and(|date| date == now.local_date())
}

/// The warning for one open store's record, or `None` when the store has no
/// schedule, is still within hours, or was already warned today.
pub fn evaluate(store: &Value, now: &LocalNow) -> Option<Alert> {
    let schedule = store.get("horario_funcionamento")?;
    let today = day_entry(schedule, now.weekday_key());
    if !is_past_closing(today.as_ref(), &now.hhmm()) {
        return None;
    }
    let watermark = store.get(WATERMARK_FIELD).and_then(Value::as_str);
    if warned_today(watermark, now) {
        return None;
    }
    Some(Alert::new(
        "Loja Aberta Fora do Horário",
        "Sua loja ainda está aberta, mas passou do horário de fechamento. Verifique se esqueceu de fechá-la.",
        ICON,
    ))
}

/// Periodic check for stores left open past their closing time.
///
/// Each store is warned at most once per local day; the watermark written
/// alongside the notification is what enforces that.
pub struct OverdueSweep {
    ctx: RuleContext,
}

impl OverdueSweep {
    pub fn new(ctx: RuleContext) -> Self {
        Self { ctx }
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = self.ctx.clock.snapshot();
        tracing::info!(day = now.weekday_key(), time = %now.hhmm(), "Checking open stores");

        let open = self
            .ctx
            .store
            .query_equal("/empresas", "status", &Value::from(STATUS_OPEN))
            .await?;
        if open.is_empty() {
            tracing::info!("No open stores");
            return Ok(SweepReport::default());
        }

        let overdue: Vec<(String, Alert)> = open
            .iter()
            .filter_map(|(id, store)| evaluate(store, &now).map(|alert| (id.clone(), alert)))
            .collect();

        let results = join_all(
            overdue
                .iter()
                .map(|(id, alert)| self.warn(id, alert, &now)),
        )
        .await;

        Ok(SweepReport {
            open: open.len(),
            overdue: overdue.len(),
            notified: results.into_iter().filter(|delivered| *delivered).count(),
        })
    }

    /// Sends the warning and stamps the watermark concurrently. Returns
    /// whether the notification went through.
    async fn warn(&self, store_id: &str, alert: &Alert, now: &LocalNow) -> bool {
        tracing::info!(store_id, "Store open past closing time");
        let mut stamp = Map::new();
        stamp.insert(WATERMARK_FIELD.to_string(), Value::from(now.iso()));
        let store_path = format!("/empresas/{store_id}");

        let (outcome, stamped) = tokio::join!(
            self.ctx.notifier.notify(store_id, alert),
            self.ctx.store.update(&store_path, stamp),
        );
        if let Err(e) = stamped {
            tracing::error!(store_id, error = %e, "Failed to record overdue warning");
        }
        !outcome.is_failed()
    }
}

#[async_trait]
impl ScheduledJob for OverdueSweep {
    fn name(&self) -> &str {
        "overdue_open_sweep"
    }

    async fn run(&self) -> Result<()> {
        let report = self.sweep().await?;
        tracing::info!(
            open = report.open,
            overdue = report.overdue,
            notified = report.notified,
            "Overdue sweep finished"
        );
        Ok(())
    }
}
