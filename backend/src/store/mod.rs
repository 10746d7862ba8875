//! Remote key-value store abstraction.
//!
//! Records are JSON documents addressed by `/`-separated paths. Writing
//! `null` (or an empty object) deletes. Reading a path returns the whole
//! subtree below it. Backends: [`MemoryStore`] and
//! [`PgStore`](crate::db::PgStore).

pub mod memory;
pub mod paths;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid store path '{0}'")]
    InvalidPath(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed record at '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Update function for [`RemoteStore::transaction`]. Receives the current
/// value and returns the replacement, or `None` to abort without writing.
pub type TransactionFn = Box<dyn FnMut(Option<Value>) -> Option<Value> + Send>;

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    pub committed: bool,
    /// Value at the path after the transaction (unchanged when aborted).
    pub snapshot: Option<Value>,
}

/// Value of a subscribed path, delivered once on subscribe and after every
/// overlapping write.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    pub value: Option<Value>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, path: &str) -> StoreResult<Option<Value>>;

    async fn set(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Single-path read-modify-write. Concurrent transactions on the same
    /// path are serialized so no update is lost.
    async fn transaction(&self, path: &str, update: TransactionFn) -> StoreResult<TransactionOutcome>;

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription>;
}

/// A live listener on a store path. Dropping it detaches the listener.
pub struct Subscription {
    path: String,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        path: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<Snapshot>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            receiver,
            detach: Some(Box::new(detach)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Waits for the next snapshot. `None` once the store side has gone away.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Returns a snapshot if one is already queued.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("path", &self.path).finish()
    }
}

/// Reads and decodes the record at `path`.
pub async fn get_json<T: DeserializeOwned>(store: &dyn RemoteStore, path: &str) -> StoreResult<Option<T>> {
    match store.get(path).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Decode { path: path.to_string(), source }),
        None => Ok(None),
    }
}

/// Encodes and writes `value` at `path`.
pub async fn set_json<T: Serialize + ?Sized>(store: &dyn RemoteStore, path: &str, value: &T) -> StoreResult<()> {
    let value = serde_json::to_value(value)
        .map_err(|source| StoreError::Decode { path: path.to_string(), source })?;
    store.set(path, value).await
}

/// Immediate children of `path` in key order.
pub async fn children(store: &dyn RemoteStore, path: &str) -> StoreResult<Vec<(String, Value)>> {
    match store.get(path).await? {
        Some(Value::Object(map)) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(entries)
        }
        _ => Ok(Vec::new()),
    }
}

/// Drops nulls and empty objects so stored trees never carry dead branches.
pub(crate) fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: serde_json::Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| normalize(child).map(|child| (key, child)))
                .collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        other => Some(other),
    }
}
