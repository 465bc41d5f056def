//! Wiring shared by the server and the one-shot `sweep` command.

use crate::config::ServerConfig;
use crate::registry::TriggerRegistry;
use anyhow::Result;
use linecut_common::time::{Clock, LocalClock};
use linecut_notify::notifier::Notifier;
use linecut_notify::plugin::DeliveryRegistry;
use linecut_rules::rules::overdue_sweep::OverdueSweep;
use linecut_rules::{builtin_handlers, RuleContext};
use linecut_store::memory::MemoryStore;
use std::path::Path;
use std::sync::Arc;

pub struct Services {
    pub store: Arc<MemoryStore>,
    pub ctx: RuleContext,
    pub triggers: TriggerRegistry,
    pub sweep: Arc<OverdueSweep>,
}

impl Services {
    /// Builds the notifier, rules and trigger registry on top of `store`.
    pub fn build(config: &ServerConfig, store: Arc<MemoryStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let clock = LocalClock::new(clock, config.timezone()?);

        let deliveries = DeliveryRegistry::default();
        let provider_config = config.push.provider_config();
        let delivery = deliveries.create_delivery(&config.push.provider, &provider_config)?;
        tracing::info!(
            provider = %config.push.provider,
            config = %deliveries.redact_config(&config.push.provider, &provider_config),
            "Push delivery configured"
        );

        let notifier = Arc::new(
            Notifier::new(store.clone(), delivery, clock.clone()).with_assets(config.push.assets()),
        );
        let ctx = RuleContext::new(store.clone(), notifier, clock);

        let mut triggers = TriggerRegistry::new();
        for handler in builtin_handlers(&ctx) {
            triggers.register(handler);
        }
        let sweep = Arc::new(OverdueSweep::new(ctx.clone()));

        Ok(Self {
            store,
            ctx,
            triggers,
            sweep,
        })
    }
}

/// Seeds the tree from the configured snapshot, or starts empty when none is
/// configured or the file does not exist yet.
pub fn open_store(config: &ServerConfig) -> Result<Arc<MemoryStore>> {
    let store = match config.snapshot_path.as_deref().map(Path::new) {
        Some(path) if path.exists() => MemoryStore::load_snapshot(path)?,
        Some(path) => {
            tracing::info!(path = %path.display(), "Snapshot not found, starting with an empty tree");
            MemoryStore::new()
        }
        None => MemoryStore::new(),
    };
    Ok(Arc::new(store))
}

/// Saves the tree back to the configured snapshot, if any.
pub fn save_store(config: &ServerConfig, store: &MemoryStore) -> Result<()> {
    if let Some(path) = config.snapshot_path.as_deref() {
        store.save_snapshot(Path::new(path))?;
    }
    Ok(())
}
