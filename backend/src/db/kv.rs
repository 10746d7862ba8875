use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool, postgres::PgListener};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::constants::KV_CHANGES_CHANNEL;
use crate::store::memory::write_into;
use crate::store::paths::{normalize_path, overlaps};
use crate::store::{
    RemoteStore, Snapshot, StoreResult, Subscription, TransactionFn, TransactionOutcome, normalize,
};

/// Postgres-backed [`RemoteStore`]. Each JSON leaf is one `kv_records` row
/// keyed by its full path; reads reassemble the subtree.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn read_tree(conn: &mut PgConnection, path: &str) -> StoreResult<Option<Value>> {
    let rows: Vec<(String, Value)> = if path.is_empty() {
        sqlx::query_as("SELECT path, value FROM kv_records")
            .fetch_all(&mut *conn)
            .await?
    } else {
        sqlx::query_as("SELECT path, value FROM kv_records WHERE path = $1 OR path LIKE $2 ESCAPE '\\'")
            .bind(path)
            .bind(descendants_pattern(path))
            .fetch_all(&mut *conn)
            .await?
    };

    Ok(assemble(path, rows))
}

async fn write_tree(conn: &mut PgConnection, path: &str, value: Option<Value>) -> StoreResult<()> {
    if path.is_empty() {
        sqlx::query("DELETE FROM kv_records").execute(&mut *conn).await?;
    } else {
        sqlx::query("DELETE FROM kv_records WHERE path = $1 OR path LIKE $2 ESCAPE '\\'")
            .bind(path)
            .bind(descendants_pattern(path))
            .execute(&mut *conn)
            .await?;

        // A leaf stored at an ancestor cannot coexist with children below it.
        let ancestors = ancestors(path);
        if !ancestors.is_empty() {
            sqlx::query("DELETE FROM kv_records WHERE path = ANY($1)")
                .bind(&ancestors)
                .execute(&mut *conn)
                .await?;
        }
    }

    if let Some(value) = value {
        for (leaf_path, leaf) in flatten(path, value) {
            sqlx::query(
                r#"
                INSERT INTO kv_records (path, value, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (path) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
                "#,
            )
            .bind(&leaf_path)
            .bind(&leaf)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

async fn lock_path(conn: &mut PgConnection, path: &str) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(path)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// `LIKE` pattern for every path strictly below `path`. Keys may contain
/// `%` and `_`, so those are escaped.
fn descendants_pattern(path: &str) -> String {
    let mut pattern = String::with_capacity(path.len() + 2);
    for c in path.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push_str("/%");
    pattern
}

/// Rebuilds the JSON value at `path` from its leaf rows.
fn assemble(path: &str, rows: Vec<(String, Value)>) -> Option<Value> {
    let mut tree = Map::new();
    for (row_path, value) in rows {
        if row_path == path {
            return Some(value);
        }
        let relative = if path.is_empty() {
            row_path.as_str()
        } else {
            match row_path.get(path.len() + 1..) {
                Some(rest) => rest,
                None => continue,
            }
        };
        let parts: Vec<&str> = relative.split('/').filter(|part| !part.is_empty()).collect();
        if let Some((first, rest)) = parts.split_first() {
            write_into(&mut tree, first, rest, Some(value));
        }
    }

    if tree.is_empty() { None } else { Some(Value::Object(tree)) }
}

fn flatten(path: &str, value: Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .flat_map(|(key, child)| {
                let child_path = if path.is_empty() { key } else { format!("{}/{}", path, key) };
                flatten(&child_path, child)
            })
            .collect(),
        leaf => vec![(path.to_string(), leaf)],
    }
}

fn ancestors(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('/').collect();
    (1..parts.len()).map(|len| parts[..len].join("/")).collect()
}

#[async_trait]
impl RemoteStore for PgStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        let path = normalize_path(path)?;
        let mut conn = self.pool.acquire().await?;
        read_tree(&mut conn, &path).await
    }

    async fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        let path = normalize_path(path)?;
        let mut tx = self.pool.begin().await?;
        lock_path(&mut tx, &path).await?;
        write_tree(&mut tx, &path, normalize(value)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn transaction(&self, path: &str, mut update: TransactionFn) -> StoreResult<TransactionOutcome> {
        let path = normalize_path(path)?;
        let mut tx = self.pool.begin().await?;
        lock_path(&mut tx, &path).await?;

        let current = read_tree(&mut tx, &path).await?;
        match update(current.clone()) {
            Some(next) => {
                let next = normalize(next);
                write_tree(&mut tx, &path, next.clone()).await?;
                tx.commit().await?;
                Ok(TransactionOutcome { committed: true, snapshot: next })
            }
            None => {
                tx.rollback().await?;
                Ok(TransactionOutcome { committed: false, snapshot: current })
            }
        }
    }

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        let path = normalize_path(path)?;
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(KV_CHANGES_CHANNEL).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let initial = self.get(&path).await?;
        let _ = sender.send(Snapshot { path: path.clone(), value: initial });

        let pool = self.pool.clone();
        let watched = path.clone();
        let task = tokio::spawn(async move {
            loop {
                let notification = match listener.recv().await {
                    Ok(notification) => notification,
                    Err(e) => {
                        tracing::warn!("kv listener on '{}' lost its connection: {}", watched, e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };
                if sender.is_closed() {
                    break;
                }
                // One write fires a NOTIFY per leaf; re-read once per batch.
                let mut relevant = overlaps(&watched, notification.payload());
                while let Some(queued) = listener.next_buffered() {
                    relevant |= overlaps(&watched, queued.payload());
                }
                if !relevant {
                    continue;
                }

                let value = match pool.acquire().await {
                    Ok(mut conn) => read_tree(&mut conn, &watched).await,
                    Err(e) => Err(e.into()),
                };
                match value {
                    Ok(value) => {
                        if sender.send(Snapshot { path: watched.clone(), value }).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to refresh '{}' after change: {}", watched, e),
                }
            }
        });

        Ok(Subscription::new(path, receiver, move || task.abort()))
    }
}
