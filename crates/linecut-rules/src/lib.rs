//! Business rules that decide when a store event deserves a notification.
//!
//! Every rule is split in two: a pure `evaluate` function over plain values
//! (testable without a store) and a handler that gathers those values from
//! the store and hands the resulting [`Alert`](linecut_common::types::Alert)
//! to the [`Notifier`]. Change-driven rules implement [`TriggerHandler`];
//! the periodic overdue sweep implements [`ScheduledJob`].

pub mod rules;
pub mod schedule;


use anyhow::Result;
use async_trait::async_trait;
use linecut_common::time::LocalClock;
use linecut_notify::notifier::Notifier;
use linecut_store::{Change, KeyValueStore};
use std::sync::Arc;

/// Shared capabilities every rule runs against.
#[derive(Clone)]
pub struct RuleContext {
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<Notifier>,
    pub clock: LocalClock,
}

impl RuleContext {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Arc<Notifier>, clock: LocalClock) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }
}

/// A rule fired by changes at locations matching [`template`](Self::template).
///
/// The dispatcher calls [`on_change`](Self::on_change) once per observed
/// change, each call in its own task. Errors are logged by the dispatcher
/// and not retried.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Stable name used in logs (e.g. `"order_cancelled"`).
    fn name(&self) -> &str;

    /// Path template with `{wildcard}` segments (e.g. `"/empresas/{userId}/status"`).
    fn template(&self) -> &str;

    async fn on_change(&self, change: &Change) -> Result<()>;
}

/// A rule run on a timer rather than by a change.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<()>;
}

/// Every change-driven rule, ready to be registered with a dispatcher.
pub fn builtin_handlers(ctx: &RuleContext) -> Vec<Arc<dyn TriggerHandler>> {
    vec![
        Arc::new(rules::order_cancelled::OrderCancelledHandler::new(ctx.clone())),
        Arc::new(rules::critical_stock::CriticalStockHandler::new(ctx.clone())),
        Arc::new(rules::store_reopened::StoreReopenedHandler::new(ctx.clone())),
        Arc::new(rules::legal_document::LegalDocumentHandler::new(ctx.clone())),
    ]
}

/// Looks up a wildcard binding the template guarantees.
pub(crate) fn required_param<'a>(change: &'a Change, name: &str) -> Result<&'a str> {
    change
        .param(name)
        .ok_or_else(|| anyhow::anyhow!("change at {} is missing the '{name}' binding", change.path))
}
