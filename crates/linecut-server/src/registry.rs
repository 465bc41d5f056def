use anyhow::Result;
use linecut_rules::TriggerHandler;
use linecut_store::path::PathTemplate;
use linecut_store::{Change, KeyValueStore};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

/// Maps path templates to the handlers that react to changes there.
///
/// [`start`](Self::start) subscribes every handler to the store's change
/// feed. Each change is dispatched in its own task, so a slow or failing
/// handler never holds up the others.
#[derive(Default)]
pub struct TriggerRegistry {
    handlers: Vec<Arc<dyn TriggerHandler>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn TriggerHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Subscribes all handlers, with one listener task per handler.
    ///
    /// Subscriptions are in place when this returns, so any write made
    /// afterwards is observed.
    pub fn start(&self, store: &dyn KeyValueStore) -> Result<RunningTriggers> {
        let in_flight = Arc::new(Mutex::new(JoinSet::new()));
        let (stop, stop_rx) = watch::channel(false);
        let mut listeners = Vec::with_capacity(self.handlers.len());

        for handler in &self.handlers {
            let template: PathTemplate = handler.template().parse()?;
            let mut changes = store.watch(&template)?;
            tracing::info!(trigger = handler.name(), template = %template, "Trigger registered");

            let handler = handler.clone();
            let in_flight = in_flight.clone();
            let mut stop_rx = stop_rx.clone();
            listeners.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        change = changes.recv() => match change {
                            Some(change) => spawn_dispatch(&in_flight, &handler, change),
                            None => break,
                        },
                        _ = stop_rx.changed() => {
                            while let Ok(change) = changes.try_recv() {
                                spawn_dispatch(&in_flight, &handler, change);
                            }
                            break;
                        }
                    }
                }
            }));
        }

        Ok(RunningTriggers {
            listeners,
            in_flight,
            stop,
        })
    }
}

/// Listener tasks started by [`TriggerRegistry::start`] and the handler
/// tasks they dispatched. Dropping it aborts the listeners.
pub struct RunningTriggers {
    listeners: Vec<JoinHandle<()>>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
    stop: watch::Sender<bool>,
}

impl RunningTriggers {
    /// Stops listening once the changes already queued are dispatched, then
    /// waits for every dispatched handler to finish.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        for listener in std::mem::take(&mut self.listeners) {
            if let Err(e) = listener.await {
                tracing::error!(error = %e, "Trigger listener failed");
            }
        }

        let mut pending = std::mem::take(
            &mut *self
                .in_flight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let waiting = pending.len();
        while pending.join_next().await.is_some() {}
        tracing::info!(waited_for = waiting, "Trigger handlers drained");
    }
}

impl Drop for RunningTriggers {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}

fn spawn_dispatch(in_flight: &Mutex<JoinSet<()>>, handler: &Arc<dyn TriggerHandler>, change: Change) {
    let mut tasks = in_flight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    while tasks.try_join_next().is_some() {}
    tasks.spawn(dispatch(handler.clone(), change));
}

async fn dispatch(handler: Arc<dyn TriggerHandler>, change: Change) {
    tracing::debug!(trigger = handler.name(), path = %change.path, "Trigger fired");
    if let Err(e) = handler.on_change(&change).await {
        tracing::error!(
            trigger = handler.name(),
            path = %change.path,
            error = %e,
            "Trigger handler failed"
        );
    }
}
