use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::paths::{is_ancestor, normalize_path, overlaps, segments};
use super::{
    RemoteStore, Snapshot, StoreError, StoreResult, Subscription, TransactionFn, TransactionOutcome,
    normalize,
};

#[derive(Debug)]
struct Listener {
    id: Uuid,
    path: String,
    sender: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Debug, Default)]
struct Inner {
    root: Map<String, Value>,
    listeners: Vec<Listener>,
    outages: Vec<String>,
}

/// In-process store holding one JSON tree. Cloning shares the tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every operation touching a path under `prefix`
    /// fails with [`StoreError::Unavailable`] until [`MemoryStore::restore`].
    pub fn fail_under(&self, prefix: &str) {
        if let (Ok(prefix), Ok(mut inner)) = (normalize_path(prefix), self.inner.lock()) {
            inner.outages.push(prefix);
        }
    }

    pub fn restore(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.outages.clear();
        }
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.listeners.len()).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl Inner {
    fn check_available(&self, path: &str) -> StoreResult<()> {
        let down = self
            .outages
            .iter()
            .any(|prefix| prefix == path || prefix.is_empty() || is_ancestor(prefix, path));
        if down {
            return Err(StoreError::Unavailable(format!("'{}' is unreachable", path)));
        }
        Ok(())
    }

    fn read(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        let Some((first, rest)) = parts.split_first() else {
            return if self.root.is_empty() { None } else { Some(Value::Object(self.root.clone())) };
        };
        let mut node = self.root.get(*first)?;
        for part in rest {
            node = node.as_object()?.get(*part)?;
        }
        Some(node.clone())
    }

    fn write(&mut self, parts: &[&str], value: Option<Value>) {
        match parts.split_first() {
            None => {
                self.root = match value {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
            }
            Some((first, rest)) => write_into(&mut self.root, first, rest, value),
        }
    }

    /// Pushes the current value of every overlapping listener path and drops
    /// listeners whose receiver is gone.
    fn notify(&mut self, written: &str) {
        let snapshots: Vec<(Uuid, Snapshot)> = self
            .listeners
            .iter()
            .filter(|listener| overlaps(&listener.path, written))
            .map(|listener| {
                let snapshot = Snapshot { path: listener.path.clone(), value: self.read(&listener.path) };
                (listener.id, snapshot)
            })
            .collect();

        let mut closed = Vec::new();
        for (id, snapshot) in snapshots {
            if let Some(listener) = self.listeners.iter().find(|listener| listener.id == id) {
                if listener.sender.send(snapshot).is_err() {
                    closed.push(id);
                }
            }
        }
        self.listeners.retain(|listener| !closed.contains(&listener.id));
    }
}

pub(crate) fn write_into(map: &mut Map<String, Value>, key: &str, rest: &[&str], value: Option<Value>) {
    match rest.split_first() {
        None => match value {
            Some(value) => {
                map.insert(key.to_string(), value);
            }
            None => {
                map.remove(key);
            }
        },
        Some((next, deeper)) => {
            if value.is_none() && !map.get(key).is_some_and(Value::is_object) {
                return;
            }
            let child = map.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            let now_empty = match child.as_object_mut() {
                Some(child_map) => {
                    write_into(child_map, next, deeper, value);
                    child_map.is_empty()
                }
                None => false,
            };
            if now_empty {
                map.remove(key);
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        let path = normalize_path(path)?;
        let inner = self.lock()?;
        inner.check_available(&path)?;
        Ok(inner.read(&path))
    }

    async fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        let path = normalize_path(path)?;
        let parts = segments(&path)?;
        let mut inner = self.lock()?;
        inner.check_available(&path)?;
        inner.write(&parts, normalize(value));
        inner.notify(&path);
        Ok(())
    }

    async fn transaction(&self, path: &str, mut update: TransactionFn) -> StoreResult<TransactionOutcome> {
        let path = normalize_path(path)?;
        let parts = segments(&path)?;
        let mut inner = self.lock()?;
        inner.check_available(&path)?;

        let current = inner.read(&path);
        match update(current.clone()) {
            Some(next) => {
                inner.write(&parts, normalize(next));
                inner.notify(&path);
                Ok(TransactionOutcome { committed: true, snapshot: inner.read(&path) })
            }
            None => Ok(TransactionOutcome { committed: false, snapshot: current }),
        }
    }

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        let path = normalize_path(path)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        {
            let mut inner = self.lock()?;
            inner.check_available(&path)?;
            let initial = Snapshot { path: path.clone(), value: inner.read(&path) };
            // Receiver is held locally, the send cannot fail.
            let _ = sender.send(initial);
            inner.listeners.push(Listener { id, path: path.clone(), sender });
        }

        let shared = Arc::clone(&self.inner);
        Ok(Subscription::new(path, receiver, move || {
            if let Ok(mut inner) = shared.lock() {
                inner.listeners.retain(|listener| listener.id != id);
            }
        }))
    }
}
