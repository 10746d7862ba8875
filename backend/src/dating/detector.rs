use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::constants::MATCH_EVENT_CHANNEL_CAPACITY;
use crate::models::{MatchEvent, MatchOutcome, NotificationKind, SwipeRecord};
use crate::services::Notifier;
use crate::store::{RemoteStore, StoreResult, get_json, paths};
use crate::utils::now_millis;

use super::DatingError;

/// Orders a pair so both parties claim the same match key.
fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a < b { (a, b) } else { (b, a) }
}

pub struct MatchDetector {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<MatchEvent>,
}

impl MatchDetector {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (events, _) = broadcast::channel(MATCH_EVENT_CHANNEL_CAPACITY);
        Self { store, notifier, events }
    }

    /// Match events for the acting user, one per newly created match.
    pub fn subscribe_events(&self) -> broadcast::Receiver<MatchEvent> {
        self.events.subscribe()
    }

    /// Called after `actor_id` has recorded a like on `target_id`.
    pub async fn maybe_promote_match(&self, actor_id: &str, target_id: &str) -> Result<MatchOutcome, DatingError> {
        paths::validate_key(actor_id)?;
        paths::validate_key(target_id)?;
        if actor_id == target_id {
            return Err(DatingError::SelfSwipe);
        }

        let counterpart: Option<SwipeRecord> =
            get_json(self.store.as_ref(), &paths::swipe(target_id, actor_id)).await?;
        if !counterpart.is_some_and(|record| record.liked) {
            self.notify(actor_id, target_id, NotificationKind::Like).await;
            return Ok(MatchOutcome::NoMatch);
        }

        // Both parties may get here concurrently. The claim transaction aborts
        // when the canonical key exists, so only one caller sees `committed`.
        let now = now_millis();
        let (first, second) = canonical_pair(actor_id, target_id);
        let claim = self
            .store
            .transaction(
                &paths::match_record(first, second),
                Box::new(move |current: Option<Value>| match current {
                    Some(_) => None,
                    None => Some(json!(now)),
                }),
            )
            .await?;
        let matched_at = claim.snapshot.as_ref().and_then(Value::as_i64).unwrap_or(now);
        if !claim.committed {
            self.ensure_mirror(second, first, matched_at).await?;
            tracing::debug!("{} and {} were already matched", actor_id, target_id);
            return Ok(MatchOutcome::AlreadyLiked);
        }

        // The claim is final. A missing mirror is repaired by the next
        // `AlreadyLiked` pass or the sweeper.
        if let Err(e) = self.ensure_mirror(second, first, matched_at).await {
            tracing::warn!("Mirror match record {} -> {} not written: {}", second, first, e);
        }

        tracing::info!("New match: {} <-> {}", actor_id, target_id);
        tokio::join!(
            self.notify(actor_id, target_id, NotificationKind::Match),
            self.notify(target_id, actor_id, NotificationKind::Match),
        );

        let event = MatchEvent {
            user_id: actor_id.to_string(),
            matched_user_id: target_id.to_string(),
            matched_at,
        };
        // No receivers is fine, the event is also returned to the caller.
        let _ = self.events.send(event.clone());
        Ok(MatchOutcome::NewMatch(event))
    }

    /// Upserts `matches/{user}/{other}` if a previous attempt stopped short.
    async fn ensure_mirror(&self, user_id: &str, other_id: &str, matched_at: i64) -> StoreResult<()> {
        let path = paths::match_record(user_id, other_id);
        if self.store.get(&path).await?.is_none() {
            self.store.set(&path, json!(matched_at)).await?;
        }
        Ok(())
    }

    async fn notify(&self, sender_id: &str, receiver_id: &str, kind: NotificationKind) {
        if let Err(e) = self.notifier.send(sender_id, receiver_id, kind).await {
            tracing::warn!("Failed to deliver {:?} notification {} -> {}: {}", kind, sender_id, receiver_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::testing::RecordingNotifier;
    use crate::store::{MemoryStore, set_json};

    fn setup() -> (MemoryStore, Arc<RecordingNotifier>, MatchDetector) {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let detector = MatchDetector::new(Arc::new(store.clone()), notifier.clone());
        (store, notifier, detector)
    }

    async fn like(store: &MemoryStore, actor: &str, target: &str) {
        set_json(store, &paths::swipe(actor, target), &SwipeRecord { liked: true, timestamp: 1 })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_one_sided_like_sends_like_notification() {
        let (store, notifier, detector) = setup();
        like(&store, "a", "b").await;

        let outcome = detector.maybe_promote_match("a", "b").await.unwrap();
        assert_eq!(outcome, MatchOutcome::NoMatch);
        assert_eq!(store.get("matches").await.unwrap(), None);
        assert_eq!(notifier.sent(), vec![("a".to_string(), "b".to_string(), NotificationKind::Like)]);
    }

    #[tokio::test]
    async fn test_counterpart_pass_is_not_a_match() {
        let (store, _notifier, detector) = setup();
        set_json(&store, &paths::swipe("b", "a"), &SwipeRecord { liked: false, timestamp: 1 })
            .await
            .unwrap();
        like(&store, "a", "b").await;

        assert_eq!(detector.maybe_promote_match("a", "b").await.unwrap(), MatchOutcome::NoMatch);
    }

    #[tokio::test]
    async fn test_mutual_like_creates_symmetric_match() {
        let (store, notifier, detector) = setup();
        let mut events = detector.subscribe_events();
        like(&store, "a", "b").await;
        like(&store, "b", "a").await;

        let outcome = detector.maybe_promote_match("b", "a").await.unwrap();
        let MatchOutcome::NewMatch(event) = outcome else {
            panic!("expected a new match, got {:?}", outcome);
        };
        assert_eq!(event.user_id, "b");
        assert_eq!(event.matched_user_id, "a");

        let ab = store.get("matches/a/b").await.unwrap().unwrap();
        let ba = store.get("matches/b/a").await.unwrap().unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.as_i64(), Some(event.matched_at));

        let mut sent = notifier.sent();
        sent.sort();
        assert_eq!(sent, vec![
            ("a".to_string(), "b".to_string(), NotificationKind::Match),
            ("b".to_string(), "a".to_string(), NotificationKind::Match),
        ]);
        assert_eq!(events.try_recv().unwrap(), event);
    }

    #[tokio::test]
    async fn test_repeat_promotion_is_idempotent() {
        let (store, notifier, detector) = setup();
        like(&store, "a", "b").await;
        like(&store, "b", "a").await;

        assert!(matches!(detector.maybe_promote_match("a", "b").await.unwrap(), MatchOutcome::NewMatch(_)));
        let first = store.get("matches/a/b").await.unwrap();

        assert_eq!(detector.maybe_promote_match("b", "a").await.unwrap(), MatchOutcome::AlreadyLiked);
        assert_eq!(store.get("matches/a/b").await.unwrap(), first);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_promotion_fires_one_match() {
        let (store, notifier, detector) = setup();
        let detector = Arc::new(detector);
        like(&store, "a", "b").await;
        like(&store, "b", "a").await;

        let left = {
            let detector = detector.clone();
            tokio::spawn(async move { detector.maybe_promote_match("a", "b").await.unwrap() })
        };
        let right = {
            let detector = detector.clone();
            tokio::spawn(async move { detector.maybe_promote_match("b", "a").await.unwrap() })
        };
        let outcomes = [left.await.unwrap(), right.await.unwrap()];

        let new_matches = outcomes.iter().filter(|o| matches!(o, MatchOutcome::NewMatch(_))).count();
        assert_eq!(new_matches, 1);
        assert!(outcomes.contains(&MatchOutcome::AlreadyLiked));
        assert_eq!(notifier.sent().len(), 2);
        assert!(store.get("matches/a/b").await.unwrap().is_some());
        assert!(store.get("matches/b/a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_mirror_is_repaired() {
        let (store, _notifier, detector) = setup();
        like(&store, "a", "b").await;
        like(&store, "b", "a").await;
        store.set("matches/a/b", json!(42)).await.unwrap();

        assert_eq!(detector.maybe_promote_match("b", "a").await.unwrap(), MatchOutcome::AlreadyLiked);
        assert_eq!(store.get("matches/b/a").await.unwrap(), Some(json!(42)));
    }

    #[tokio::test]
    async fn test_failed_mirror_write_still_notifies() {
        let (store, notifier, detector) = setup();
        let mut events = detector.subscribe_events();
        like(&store, "a", "b").await;
        like(&store, "b", "a").await;
        store.fail_under("matches/b");

        let outcome = detector.maybe_promote_match("a", "b").await.unwrap();
        assert!(matches!(outcome, MatchOutcome::NewMatch(_)));
        assert_eq!(notifier.sent().len(), 2);
        assert!(events.try_recv().is_ok());

        store.restore();
        assert_eq!(store.get("matches/b/a").await.unwrap(), None);
        assert_eq!(detector.maybe_promote_match("b", "a").await.unwrap(), MatchOutcome::AlreadyLiked);
        assert_eq!(store.get("matches/b/a").await.unwrap(), store.get("matches/a/b").await.unwrap());
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_match() {
        let (store, notifier, detector) = setup();
        notifier.fail_for("a");
        like(&store, "a", "b").await;
        like(&store, "b", "a").await;

        assert!(detector.maybe_promote_match("b", "a").await.unwrap().is_match());
        assert!(store.get("matches/a/b").await.unwrap().is_some());
        assert_eq!(notifier.sent(), vec![("a".to_string(), "b".to_string(), NotificationKind::Match)]);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let (store, _notifier, detector) = setup();
        store.fail_under("swipes");
        assert!(matches!(
            detector.maybe_promote_match("a", "b").await,
            Err(DatingError::Store(_))
        ));
    }

    #[test]
    fn test_canonical_pair() {
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
    }
}
