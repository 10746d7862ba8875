use serde_json::json;
use std::sync::Arc;

use crate::models::{MatchOutcome, SwipeRecord};
use crate::store::{RemoteStore, paths, set_json};
use crate::utils::now_millis;

use super::{DatingError, MatchDetector};

pub struct SwipeRecorder {
    store: Arc<dyn RemoteStore>,
    detector: Arc<MatchDetector>,
}

impl SwipeRecorder {
    pub fn new(store: Arc<dyn RemoteStore>, detector: Arc<MatchDetector>) -> Self {
        Self { store, detector }
    }

    pub fn detector(&self) -> &Arc<MatchDetector> {
        &self.detector
    }

    /// Records `actor_id`'s decision about `target_id`. A later swipe on the
    /// same pair overwrites the earlier one. Returns the match outcome for
    /// likes and `None` for passes.
    ///
    /// The writes are independent: a failure part way through leaves the
    /// records written so far in place.
    pub async fn record_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        liked: bool,
    ) -> Result<Option<MatchOutcome>, DatingError> {
        paths::validate_key(actor_id)?;
        paths::validate_key(target_id)?;
        if actor_id == target_id {
            return Err(DatingError::SelfSwipe);
        }

        let now = now_millis();
        set_json(
            self.store.as_ref(),
            &paths::swipe(actor_id, target_id),
            &SwipeRecord { liked, timestamp: now },
        )
        .await?;

        if !liked {
            tracing::debug!("{} passed on {}", actor_id, target_id);
            return Ok(None);
        }

        self.store.set(&paths::like_given(actor_id, target_id), json!(now)).await?;
        self.store.set(&paths::like_received(target_id, actor_id), json!(now)).await?;
        tracing::debug!("{} liked {}", actor_id, target_id);

        let outcome = self.detector.maybe_promote_match(actor_id, target_id).await?;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use crate::services::notifications::testing::RecordingNotifier;
    use crate::store::{MemoryStore, get_json};

    fn setup() -> (MemoryStore, Arc<RecordingNotifier>, SwipeRecorder) {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let shared: Arc<dyn RemoteStore> = Arc::new(store.clone());
        let detector = Arc::new(MatchDetector::new(shared.clone(), notifier.clone()));
        (store, notifier, SwipeRecorder::new(shared, detector))
    }

    #[tokio::test]
    async fn test_pass_writes_only_swipe_record() {
        let (store, notifier, recorder) = setup();

        assert_eq!(recorder.record_swipe("a", "b", false).await.unwrap(), None);

        let record: SwipeRecord = get_json(&store, "swipes/a/b").await.unwrap().unwrap();
        assert!(!record.liked);
        assert_eq!(store.get("likesGiven").await.unwrap(), None);
        assert_eq!(store.get("likesReceived").await.unwrap(), None);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_like_writes_markers_and_notifies_target() {
        let (store, notifier, recorder) = setup();

        let outcome = recorder.record_swipe("a", "b", true).await.unwrap();
        assert_eq!(outcome, Some(MatchOutcome::NoMatch));

        let record: SwipeRecord = get_json(&store, "swipes/a/b").await.unwrap().unwrap();
        assert!(record.liked);
        assert_eq!(store.get("likesGiven/a/b").await.unwrap().and_then(|v| v.as_i64()), Some(record.timestamp));
        assert_eq!(store.get("likesReceived/b/a").await.unwrap().and_then(|v| v.as_i64()), Some(record.timestamp));
        assert_eq!(store.get("matches").await.unwrap(), None);
        assert_eq!(notifier.sent(), vec![("a".to_string(), "b".to_string(), NotificationKind::Like)]);
    }

    #[tokio::test]
    async fn test_second_like_creates_match() {
        let (store, notifier, recorder) = setup();

        recorder.record_swipe("a", "b", true).await.unwrap();
        let outcome = recorder.record_swipe("b", "a", true).await.unwrap();

        assert!(matches!(outcome, Some(MatchOutcome::NewMatch(ref event)) if event.user_id == "b"));
        assert!(store.get("matches/a/b").await.unwrap().is_some());
        assert!(store.get("matches/b/a").await.unwrap().is_some());
        let match_notifications = notifier
            .sent()
            .into_iter()
            .filter(|(_, _, kind)| *kind == NotificationKind::Match)
            .count();
        assert_eq!(match_notifications, 2);
    }

    #[tokio::test]
    async fn test_later_swipe_overwrites_but_match_stays() {
        let (store, _notifier, recorder) = setup();
        recorder.record_swipe("a", "b", true).await.unwrap();
        recorder.record_swipe("b", "a", true).await.unwrap();

        recorder.record_swipe("a", "b", false).await.unwrap();

        let record: SwipeRecord = get_json(&store, "swipes/a/b").await.unwrap().unwrap();
        assert!(!record.liked);
        assert!(store.get("matches/a/b").await.unwrap().is_some());
        assert!(store.get("likesGiven/a/b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejects_self_swipe_and_bad_ids() {
        let (_store, _notifier, recorder) = setup();
        assert!(matches!(recorder.record_swipe("a", "a", true).await, Err(DatingError::SelfSwipe)));
        assert!(matches!(recorder.record_swipe("a/b", "c", true).await, Err(DatingError::Store(_))));
    }
}
