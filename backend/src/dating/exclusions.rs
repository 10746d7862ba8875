use std::collections::HashSet;

use crate::constants::LIKE_EXCLUSION_WINDOW_MS;
use crate::store::{RemoteStore, children, paths};

/// True while a like given at `given_at` still hides the receiver.
pub fn within_like_window(given_at: i64, now: i64) -> bool {
    now.saturating_sub(given_at) <= LIKE_EXCLUSION_WINDOW_MS
}

/// Users hidden from `user_id`'s discovery feed: everyone matched, plus
/// everyone liked within the last seven days. Best effort: a subtree that
/// cannot be fetched contributes nothing.
pub async fn compute_exclusions(store: &dyn RemoteStore, user_id: &str, now: i64) -> HashSet<String> {
    let mut excluded = HashSet::new();

    match children(store, &paths::matches_of(user_id)).await {
        Ok(matches) => excluded.extend(matches.into_iter().map(|(other_id, _)| other_id)),
        Err(e) => tracing::warn!("Could not load matches for {}: {}", user_id, e),
    }

    match children(store, &paths::likes_given_by(user_id)).await {
        Ok(likes) => {
            let recent = likes.into_iter().filter_map(|(receiver_id, given_at)| {
                let given_at = given_at.as_i64()?;
                within_like_window(given_at, now).then_some(receiver_id)
            });
            excluded.extend(recent);
        }
        Err(e) => tracing::warn!("Could not load given likes for {}: {}", user_id, e),
    }

    excluded
}
