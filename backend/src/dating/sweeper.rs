use std::collections::HashSet;

use crate::constants::SWIPES_ROOT;
use crate::models::{MatchOutcome, SwipeRecord};
use crate::store::{RemoteStore, StoreResult, children};

use super::MatchDetector;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub mutual_pairs: usize,
    pub matches_created: usize,
    pub failures: usize,
}

/// Every mutually liked pair, lower id first, in store order.
pub async fn find_mutual_likes(store: &dyn RemoteStore) -> StoreResult<Vec<(String, String)>> {
    let mut liked = HashSet::new();
    for (actor_id, targets) in children(store, SWIPES_ROOT).await? {
        let Some(targets) = targets.as_object() else {
            continue;
        };
        for (target_id, record) in targets {
            match serde_json::from_value::<SwipeRecord>(record.clone()) {
                Ok(record) if record.liked => {
                    liked.insert((actor_id.clone(), target_id.clone()));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping malformed swipe {}/{}: {}", actor_id, target_id, e),
            }
        }
    }

    let mut pairs: Vec<(String, String)> = liked
        .iter()
        .filter(|(actor_id, target_id)| actor_id < target_id)
        .filter(|(actor_id, target_id)| liked.contains(&(target_id.clone(), actor_id.clone())))
        .cloned()
        .collect();
    pairs.sort();
    Ok(pairs)
}

/// Promotes mutual likes whose match record never got written, e.g. after a
/// client died between its like and the match claim. Existing matches are
/// left alone by the claim itself.
pub async fn sweep_mutual_likes(store: &dyn RemoteStore, detector: &MatchDetector) -> StoreResult<SweepReport> {
    let pairs = find_mutual_likes(store).await?;
    let mut report = SweepReport { mutual_pairs: pairs.len(), ..Default::default() };

    for (first, second) in &pairs {
        match detector.maybe_promote_match(first, second).await {
            Ok(MatchOutcome::NewMatch(_)) => {
                tracing::info!("Repaired missing match {} <-> {}", first, second);
                report.matches_created += 1;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Failed to promote {} <-> {}: {}", first, second, e);
                report.failures += 1;
            }
        }
    }

    Ok(report)
}
