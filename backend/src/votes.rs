//! Up/down vote counters kept consistent under concurrent voters by routing
//! every change through a single-record store transaction.

use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::models::{VoteDirection, VoteTally};
use crate::store::{RemoteStore, StoreError, StoreResult, get_json, paths};

pub async fn cast_vote(
    store: &dyn RemoteStore,
    post_id: &str,
    user_id: &str,
    direction: VoteDirection,
) -> StoreResult<VoteTally> {
    paths::validate_key(post_id)?;
    paths::validate_key(user_id)?;

    let path = paths::votes(post_id);
    let voter = user_id.to_string();
    // A malformed tally aborts the transaction instead of being overwritten.
    let decode_error = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&decode_error);
    let outcome = store
        .transaction(
            &path,
            Box::new(move |current: Option<Value>| {
                let mut tally = match current.map(serde_json::from_value::<VoteTally>) {
                    Some(Ok(tally)) => tally,
                    Some(Err(e)) => {
                        if let Ok(mut slot) = captured.lock() {
                            *slot = Some(e);
                        }
                        return None;
                    }
                    None => VoteTally::default(),
                };
                tally.apply(&voter, direction);
                serde_json::to_value(&tally).ok()
            }),
        )
        .await?;

    if !outcome.committed {
        if let Some(source) = decode_error.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(StoreError::Decode { path, source });
        }
    }

    let snapshot = outcome.snapshot.unwrap_or(Value::Null);
    if snapshot.is_null() {
        return Ok(VoteTally::default());
    }
    serde_json::from_value(snapshot).map_err(|source| StoreError::Decode { path, source })
}

pub async fn get_tally(store: &dyn RemoteStore, post_id: &str) -> StoreResult<VoteTally> {
    paths::validate_key(post_id)?;
    Ok(get_json(store, &paths::votes(post_id)).await?.unwrap_or_default())
}
