//! Hierarchical key-value store used as the single source of state.
//!
//! Values are JSON trees addressed by slash-separated paths. Besides point
//! reads and writes the store offers an atomic read-modify-write
//! ([`KeyValueStore::transaction`]), equality queries over a node's
//! children, and change feeds keyed by [`path::PathTemplate`]s, which is what
//! the trigger handlers subscribe to.
//!
//! The bundled backend is [`memory::MemoryStore`], an in-process tree that
//! can be seeded from and saved to a JSON snapshot file.

pub mod error;
pub mod memory;
pub mod path;


use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::path::PathTemplate;

/// Update function applied by [`KeyValueStore::transaction`].
///
/// It receives the current value (or `None`) and returns the value to
/// commit; returning `None` aborts without writing. Backends with
/// optimistic concurrency may call it more than once.
pub type UpdateFn<'a> = dyn Fn(Option<Value>) -> Option<Value> + Send + Sync + 'a;

/// One observed mutation at a location matching a watched template.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Concrete path of the changed location (`/empresas/abc/status`).
    pub path: String,
    /// Wildcard bindings from the template (`userId -> abc`).
    pub params: HashMap<String, String>,
    /// Value before the write; `None` when the location was created.
    pub before: Option<Value>,
    /// Value after the write; `None` when the location was deleted.
    pub after: Option<Value>,
}

impl Change {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// True when both sides exist, i.e. an update rather than a create or
    /// delete.
    pub fn is_update(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }
}

/// Persistence backend shared by the notifier and every rule.
///
/// Implementations must be `Send + Sync`: trigger handlers run as
/// independent tasks and all hit the store concurrently.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value at `path`, or `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Replaces the value at `path`. Writing `Value::Null` deletes it.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Merges `fields` into the object at `path`, leaving other children
    /// untouched. A `Null` field deletes that child.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Appends `value` under `path` with a new insertion-ordered key and
    /// returns the key.
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Atomically applies `update` to the value at `path` and returns the
    /// committed value (`None` if the update aborted).
    async fn transaction(&self, path: &str, update: &UpdateFn<'_>) -> Result<Option<Value>>;

    /// Returns the children of `path` whose `child` field equals `value`,
    /// keyed by child name.
    async fn query_equal(
        &self,
        path: &str,
        child: &str,
        value: &Value,
    ) -> Result<BTreeMap<String, Value>>;

    /// Subscribes to changes at every location matching `template`.
    ///
    /// Each write delivers one [`Change`] per matching location whose value
    /// actually changed.
    fn watch(&self, template: &PathTemplate) -> Result<UnboundedReceiver<Change>>;

    /// Checks that the store is reachable without reading any data.
    async fn ping(&self) -> Result<()>;

    /// Atomically adds `delta` to the integer at `path`, treating a missing
    /// or non-integer value as 0. Returns the new value.
    async fn increment(&self, path: &str, delta: i64) -> Result<i64> {
        let committed = self
            .transaction(path, &|current: Option<Value>| {
                let count = current.as_ref().and_then(Value::as_i64).unwrap_or(0);
                Some(Value::from(count + delta))
            })
            .await?;
        Ok(committed.as_ref().and_then(Value::as_i64).unwrap_or(0))
    }
}
