use crate::error::StoreError;
use crate::path::{self, PathTemplate, Segment};
use crate::{Change, KeyValueStore, UpdateFn};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct Watcher {
    template: PathTemplate,
    sender: UnboundedSender<Change>,
}

/// What a watcher needs captured before a write so its changes can be
/// computed afterwards.
enum Capture {
    /// The template names the written location or one of its ancestors.
    Ancestor { concrete: Vec<String>, before: Option<Value> },
    /// The template names locations below the written path.
    Descendant,
}

/// In-process JSON tree.
///
/// All writes take the tree's write lock, which makes every operation,
/// including [`KeyValueStore::transaction`], atomic with respect to the
/// others. Change notifications are computed under the same lock, so each
/// watcher sees changes in commit order.
pub struct MemoryStore {
    root: RwLock<Value>,
    watchers: Mutex<Vec<Watcher>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Builds a store whose tree is `root`, which must be an object.
    pub fn from_value(root: Value) -> crate::error::Result<Self> {
        if !root.is_object() {
            return Err(StoreError::NonObjectRoot);
        }
        let mut root = root;
        prune_nulls(&mut root);
        Ok(Self {
            root: RwLock::new(root),
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Loads the tree from a JSON snapshot file.
    pub fn load_snapshot(file: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(file)?;
        let root: Value = serde_json::from_str(&content)?;
        let store = Self::from_value(root)?;
        tracing::info!(path = %file.display(), "Loaded store snapshot");
        Ok(store)
    }

    /// Writes the whole tree to `file` as pretty-printed JSON.
    pub fn save_snapshot(&self, file: &Path) -> crate::error::Result<()> {
        let content = {
            let root = self.root.read().unwrap_or_else(|p| p.into_inner());
            serde_json::to_string_pretty(&*root)?
        };
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file, content)?;
        tracing::info!(path = %file.display(), "Saved store snapshot");
        Ok(())
    }

    /// Copy of the whole tree.
    pub fn to_value(&self) -> Value {
        self.root.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn read(&self, segs: &[String]) -> Option<Value> {
        let root = self.root.read().unwrap_or_else(|p| p.into_inner());
        node(&root, segs).cloned()
    }

    /// Runs `mutate` against the tree under the write lock, then notifies
    /// every watcher whose locations changed.
    fn write<R>(&self, segs: &[String], mutate: impl FnOnce(&mut Value) -> R) -> R {
        let mut root = self.root.write().unwrap_or_else(|p| p.into_inner());
        let mut watchers = self.watchers.lock().unwrap_or_else(|p| p.into_inner());
        watchers.retain(|w| !w.sender.is_closed());

        let captures: Vec<(usize, Capture)> = watchers
            .iter()
            .enumerate()
            .filter(|(_, w)| w.template.overlaps(segs))
            .map(|(i, w)| {
                if w.template.len() <= segs.len() {
                    let concrete = segs[..w.template.len()].to_vec();
                    let before = node(&root, &concrete).cloned();
                    (i, Capture::Ancestor { concrete, before })
                } else {
                    (i, Capture::Descendant)
                }
            })
            .collect();
        let subtree_before = captures
            .iter()
            .any(|(_, c)| matches!(c, Capture::Descendant))
            .then(|| node(&root, segs).cloned())
            .flatten();

        let result = mutate(&mut root);
        if let Some(written) = node_mut(&mut root, segs) {
            prune_nulls(written);
        }
        prune_along(&mut root, segs);
        if !root.is_object() {
            *root = Value::Object(Map::new());
        }

        for (i, capture) in captures {
            let watcher = &watchers[i];
            let mut changes = Vec::new();
            match capture {
                Capture::Ancestor { concrete, before } => {
                    let after = node(&root, &concrete).cloned();
                    if before != after {
                        changes.push((concrete, before, after));
                    }
                }
                Capture::Descendant => {
                    let rest = &watcher.template.segments()[segs.len()..];
                    expand(
                        rest,
                        subtree_before.as_ref(),
                        node(&root, segs),
                        segs.to_vec(),
                        &mut changes,
                    );
                }
            }
            for (concrete, before, after) in changes {
                let params = watcher.template.bind(&concrete).unwrap_or_default();
                let change = Change {
                    path: path::join(&concrete),
                    params,
                    before,
                    after,
                };
                if watcher.sender.send(change).is_err() {
                    tracing::debug!(template = %watcher.template, "Watcher dropped");
                }
            }
        }

        result
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let segs = path::segments(path)?;
        Ok(self.read(&segs))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let segs = path::segments(path)?;
        self.write(&segs, |root| set_at(root, &segs, value));
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let segs = path::segments(path)?;
        let mut targets = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let mut child = segs.clone();
            child.extend(path::segments(&key)?);
            targets.push((child, value));
        }
        self.write(&segs, |root| {
            for (child, value) in targets {
                set_at(root, &child, value);
            }
        });
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let mut segs = path::segments(path)?;
        let key = linecut_common::id::next_id();
        segs.push(key.clone());
        self.write(&segs, |root| set_at(root, &segs, value));
        Ok(key)
    }

    async fn transaction(&self, path: &str, update: &UpdateFn<'_>) -> Result<Option<Value>> {
        let segs = path::segments(path)?;
        let committed = self.write(&segs, |root| {
            let current = node(root, &segs).cloned();
            let next = update(current)?;
            set_at(root, &segs, next);
            node(root, &segs).cloned()
        });
        Ok(committed)
    }

    async fn query_equal(
        &self,
        path: &str,
        child: &str,
        value: &Value,
    ) -> Result<BTreeMap<String, Value>> {
        let segs = path::segments(path)?;
        let root = self.root.read().unwrap_or_else(|p| p.into_inner());
        let Some(Value::Object(children)) = node(&root, &segs) else {
            return Ok(BTreeMap::new());
        };
        Ok(children
            .iter()
            .filter(|(_, v)| v.get(child) == Some(value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        let root = self.root.read().unwrap_or_else(|p| p.into_inner());
        if !root.is_object() {
            return Err(StoreError::NonObjectRoot.into());
        }
        Ok(())
    }

    fn watch(&self, template: &PathTemplate) -> Result<UnboundedReceiver<Change>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.watchers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Watcher {
                template: template.clone(),
                sender,
            });
        tracing::debug!(template = %template, "Watch registered");
        Ok(receiver)
    }
}

fn node<'a>(root: &'a Value, segs: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for seg in segs {
        current = current.as_object()?.get(seg)?;
    }
    Some(current)
}

/// Writes `value` at `segs`, creating intermediate objects. `Null` removes.
fn set_at(root: &mut Value, segs: &[String], value: Value) {
    let Some((last, parents)) = segs.split_last() else {
        *root = value;
        return;
    };
    if value.is_null() {
        remove_at(root, segs);
        return;
    }
    let mut current = root;
    for seg in parents {
        current = ensure_object(current)
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.clone(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value
        .as_object_mut()
        .expect("value was just replaced with an object")
}

fn node_mut<'a>(root: &'a mut Value, segs: &[String]) -> Option<&'a mut Value> {
    let mut current = root;
    for seg in segs {
        current = current.as_object_mut()?.get_mut(seg)?;
    }
    Some(current)
}

fn remove_at(root: &mut Value, segs: &[String]) {
    let Some((last, parents)) = segs.split_last() else {
        return;
    };
    let mut current = root;
    for seg in parents {
        match current.as_object_mut().and_then(|m| m.get_mut(seg)) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(map) = current.as_object_mut() {
        map.remove(last);
    }
}

/// Drops `Null` members and the empty objects they leave behind.
fn prune_nulls(value: &mut Value) {
    if let Value::Object(map) = value {
        prune_empty(map);
    }
}

fn prune_empty(map: &mut Map<String, Value>) {
    map.retain(|_, v| !v.is_null());
    for child in map.values_mut() {
        if let Value::Object(inner) = child {
            prune_empty(inner);
        }
    }
    map.retain(|_, v| !matches!(v, Value::Object(inner) if inner.is_empty()));
}

/// Removes objects along `segs` that a write left empty.
fn prune_along(value: &mut Value, segs: &[String]) {
    let Some((head, tail)) = segs.split_first() else {
        return;
    };
    if let Value::Object(map) = value {
        let emptied = match map.get_mut(head) {
            Some(child) => {
                prune_along(child, tail);
                matches!(child, Value::Object(inner) if inner.is_empty())
            }
            None => false,
        };
        if emptied {
            map.remove(head);
        }
    }
}

/// Walks the remaining template segments through the before/after
/// subtrees and records every concrete location whose value differs.
fn expand(
    rest: &[Segment],
    before: Option<&Value>,
    after: Option<&Value>,
    prefix: Vec<String>,
    out: &mut Vec<(Vec<String>, Option<Value>, Option<Value>)>,
) {
    let Some((head, tail)) = rest.split_first() else {
        if before != after {
            out.push((prefix, before.cloned(), after.cloned()));
        }
        return;
    };
    let keys: Vec<String> = match head {
        Segment::Literal(lit) => vec![lit.clone()],
        Segment::Wildcard(_) => {
            let mut keys = BTreeSet::new();
            for side in [before, after].into_iter().flatten() {
                if let Some(map) = side.as_object() {
                    keys.extend(map.keys().cloned());
                }
            }
            keys.into_iter().collect()
        }
    };
    for key in keys {
        let mut next = prefix.clone();
        next.push(key.clone());
        expand(tail, child(before, &key), child(after, &key), next, out);
    }
}

fn child<'v>(value: Option<&'v Value>, key: &str) -> Option<&'v Value> {
    value?.as_object()?.get(key)
}

/// Parameters of a concrete path against a template, for callers that build
/// [`Change`]s by hand (tests, external event adapters).
pub fn bind_params(template: &PathTemplate, path: &str) -> Option<HashMap<String, String>> {
    template.bind(&path::segments(path).ok()?)
}
