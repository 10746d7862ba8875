use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::{EARTH_RADIUS_KM, USERS_ROOT};
use crate::models::{DatingFilters, Location, MatchOutcome, Profile};
use crate::services::LocationProvider;
use crate::store::{RemoteStore, Subscription, children, paths};
use crate::utils::{now_millis, time::today};

use super::{DatingError, SwipeRecorder, compute_exclusions, load_filters};

/// Great-circle distance in km.
pub fn haversine_km(from: Location, to: Location) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    // Rounding can push `a` just past 1 for near-antipodal points.
    let a = ((d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2)).clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance between two optional positions; unknown if either is missing.
pub fn distance_between(from: Option<Location>, to: Option<Location>) -> Option<f64> {
    Some(haversine_km(from?, to?))
}

/// Viewer-side inputs to filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscoveryContext {
    pub origin: Option<Location>,
    pub today: NaiveDate,
}

pub fn matches_standing_filters(profile: &Profile, filters: &DatingFilters, context: &DiscoveryContext) -> bool {
    let age_ok = profile
        .age_on(context.today)
        .is_some_and(|age| filters.accepts_age(age));
    if !age_ok || !filters.accepts_gender(profile.gender.as_deref()) {
        return false;
    }

    match filters.max_distance_km() {
        None => true,
        Some(max_km) => distance_between(context.origin, profile.location).is_some_and(|km| km <= max_km),
    }
}

/// Candidates in store order. A non-empty search term bypasses the standing
/// filters entirely and matches usernames case-insensitively; exclusions
/// always apply.
pub fn filter_candidates(
    all_profiles: &[Profile],
    filters: &DatingFilters,
    exclusions: &HashSet<String>,
    search_text: &str,
    context: &DiscoveryContext,
) -> Vec<Profile> {
    let needle = search_text.trim().to_lowercase();
    all_profiles
        .iter()
        .filter(|profile| !exclusions.contains(&profile.id))
        .filter(|profile| {
            if needle.is_empty() {
                matches_standing_filters(profile, filters, context)
            } else {
                profile.username.to_lowercase().contains(&needle)
            }
        })
        .cloned()
        .collect()
}

/// One user's discovery stack with a first-available cursor that advances
/// on every swipe.
pub struct DiscoveryFeed {
    user_id: String,
    store: Arc<dyn RemoteStore>,
    recorder: Arc<SwipeRecorder>,
    locations: Arc<dyn LocationProvider>,
    search_text: String,
    candidates: Vec<Profile>,
    cursor: usize,
    subscription: Option<Subscription>,
}

impl DiscoveryFeed {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn RemoteStore>,
        recorder: Arc<SwipeRecorder>,
        locations: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            recorder,
            locations,
            search_text: String::new(),
            candidates: Vec::new(),
            cursor: 0,
            subscription: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Takes effect on the next [`DiscoveryFeed::refresh`].
    pub fn set_search_text(&mut self, search_text: impl Into<String>) {
        self.search_text = search_text.into();
    }

    /// Reloads profiles, filters, exclusions and location, and rewinds the
    /// cursor. Returns the number of candidates.
    pub async fn refresh(&mut self) -> Result<usize, DatingError> {
        paths::validate_key(&self.user_id)?;

        let profiles: Vec<Profile> = children(self.store.as_ref(), USERS_ROOT)
            .await?
            .into_iter()
            .filter_map(|(id, value)| Profile::from_entry(&id, value))
            .collect();
        let filters = load_filters(self.store.as_ref(), &self.user_id).await;
        let mut exclusions = compute_exclusions(self.store.as_ref(), &self.user_id, now_millis()).await;
        exclusions.insert(self.user_id.clone());

        let origin = match self.locations.get_location(&self.user_id).await {
            Ok(origin) => origin,
            Err(e) => {
                tracing::warn!("Location unavailable for {}: {}", self.user_id, e);
                None
            }
        };
        let context = DiscoveryContext { origin, today: today() };

        self.candidates = filter_candidates(&profiles, &filters, &exclusions, &self.search_text, &context);
        self.cursor = 0;
        tracing::debug!("Discovery for {}: {} of {} profiles", self.user_id, self.candidates.len(), profiles.len());
        Ok(self.candidates.len())
    }

    pub fn candidates(&self) -> &[Profile] {
        &self.candidates
    }

    pub fn current(&self) -> Option<&Profile> {
        self.candidates.get(self.cursor)
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len().saturating_sub(self.cursor)
    }

    /// Records a swipe on the current candidate and moves to the next one.
    /// `Ok(None)` when the stack is exhausted or the swipe was a pass.
    pub async fn swipe(&mut self, liked: bool) -> Result<Option<MatchOutcome>, DatingError> {
        let Some(target_id) = self.current().map(|profile| profile.id.clone()) else {
            return Ok(None);
        };
        let outcome = self.recorder.record_swipe(&self.user_id, &target_id, liked).await?;
        self.cursor += 1;
        Ok(outcome)
    }

    /// Attaches the profile listener and refreshes. No-op while listening.
    pub async fn resume(&mut self) -> Result<(), DatingError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let mut subscription = self.store.subscribe(USERS_ROOT).await?;
        // The initial snapshot is covered by the refresh below.
        let _ = subscription.try_recv();
        self.subscription = Some(subscription);
        self.refresh().await?;
        Ok(())
    }

    /// Detaches the profile listener while the screen is not visible.
    pub fn pause(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    /// Waits for the next profile change and refreshes. Returns `false`
    /// immediately when paused or once the listener has closed.
    pub async fn next_change(&mut self) -> Result<bool, DatingError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(false);
        };
        if subscription.recv().await.is_none() {
            self.subscription = None;
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dating::MatchDetector;
    use crate::services::StoreLocationProvider;
    use crate::services::notifications::testing::RecordingNotifier;
    use crate::store::MemoryStore;
    use serde_json::json;

    const BERLIN: Location = Location { latitude: 52.52, longitude: 13.405 };
    const POTSDAM: Location = Location { latitude: 52.3906, longitude: 13.0645 };
    const PARIS: Location = Location { latitude: 48.8566, longitude: 2.3522 };

    fn today_fixed() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn profile(id: &str, username: &str, gender: &str, born: i32, location: Option<Location>) -> Profile {
        Profile {
            id: id.to_string(),
            username: username.to_string(),
            gender: Some(gender.to_string()),
            birth_date: NaiveDate::from_ymd_opt(born, 1, 1),
            location,
            ..Default::default()
        }
    }

    fn ids(profiles: &[Profile]) -> Vec<&str> {
        profiles.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_haversine_zero_and_symmetric() {
        assert_eq!(haversine_km(BERLIN, BERLIN), 0.0);
        let there = haversine_km(BERLIN, PARIS);
        let back = haversine_km(PARIS, BERLIN);
        assert!((there - back).abs() < 1e-9);
        assert!((there - 878.0).abs() < 5.0, "Berlin-Paris was {}", there);
    }

    #[test]
    fn test_antipodal_distance_is_finite() {
        let pairs = [
            (Location { latitude: 0.0, longitude: 0.0 }, Location { latitude: 0.0, longitude: 180.0 }),
            (Location { latitude: 90.0, longitude: 0.0 }, Location { latitude: -90.0, longitude: 0.0 }),
            (BERLIN, Location { latitude: -52.52, longitude: 13.405 - 180.0 }),
            (Location { latitude: 45.0, longitude: 10.0 }, Location { latitude: -45.0, longitude: -170.0 }),
        ];
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        for (from, to) in pairs {
            let km = haversine_km(from, to);
            assert!(km.is_finite(), "{:?} -> {:?} was {}", from, to, km);
            assert!((km - half_circumference).abs() < 1.0, "{:?} -> {:?} was {}", from, to, km);
        }
    }

    #[test]
    fn test_unknown_location_has_no_distance() {
        assert_eq!(distance_between(Some(BERLIN), None), None);
        assert_eq!(distance_between(None, Some(BERLIN)), None);
    }

    #[test]
    fn test_standing_filters() {
        let filters = DatingFilters { age_start: 25, age_end: 35, distance: 50, gender: "woman".to_string() };
        let context = DiscoveryContext { origin: Some(BERLIN), today: today_fixed() };
        let profiles = vec![
            profile("near", "nora", "woman", 1995, Some(POTSDAM)),
            profile("far", "fay", "woman", 1995, Some(PARIS)),
            profile("young", "yara", "woman", 2004, Some(POTSDAM)),
            profile("man", "max", "man", 1995, Some(POTSDAM)),
            profile("nowhere", "nina", "Woman", 1995, None),
        ];

        let result = filter_candidates(&profiles, &filters, &HashSet::new(), "", &context);
        assert_eq!(ids(&result), vec!["near"]);
    }

    #[test]
    fn test_global_distance_ignores_location() {
        let filters = DatingFilters::default();
        let context = DiscoveryContext { origin: None, today: today_fixed() };
        let profiles = vec![
            profile("far", "fay", "woman", 1995, Some(PARIS)),
            profile("nowhere", "nina", "woman", 1995, None),
        ];

        let result = filter_candidates(&profiles, &filters, &HashSet::new(), "  ", &context);
        assert_eq!(ids(&result), vec!["far", "nowhere"]);
    }

    #[test]
    fn test_search_overrides_filters_but_not_exclusions() {
        let filters = DatingFilters { age_start: 25, age_end: 35, distance: 10, gender: "woman".to_string() };
        let context = DiscoveryContext { origin: Some(BERLIN), today: today_fixed() };
        let profiles = vec![
            profile("inside", "Annabel", "woman", 1995, Some(BERLIN)),
            profile("outside", "hANNah", "man", 1960, Some(PARIS)),
            profile("excluded", "anna", "woman", 1995, Some(BERLIN)),
            profile("other", "zoe", "woman", 1995, Some(BERLIN)),
        ];
        let exclusions: HashSet<String> = ["excluded".to_string()].into_iter().collect();

        let result = filter_candidates(&profiles, &filters, &exclusions, " ANN ", &context);
        assert_eq!(ids(&result), vec!["inside", "outside"]);
    }

    async fn feed_fixture() -> (MemoryStore, DiscoveryFeed) {
        let store = MemoryStore::new();
        let shared: Arc<dyn RemoteStore> = Arc::new(store.clone());
        let detector = Arc::new(MatchDetector::new(shared.clone(), Arc::new(RecordingNotifier::default())));
        let recorder = Arc::new(SwipeRecorder::new(shared.clone(), detector));
        let locations = Arc::new(StoreLocationProvider::new(shared.clone()));

        for (id, name) in [("me", "me"), ("b", "bea"), ("c", "cleo"), ("d", "dana")] {
            store
                .set(&paths::user(id), json!({"username": name, "gender": "woman", "birthDate": "1995-01-01"}))
                .await
                .unwrap();
        }
        (store.clone(), DiscoveryFeed::new("me", shared, recorder, locations))
    }

    #[tokio::test]
    async fn test_feed_cursor_advances_per_swipe() {
        let (store, mut feed) = feed_fixture().await;
        assert_eq!(feed.refresh().await.unwrap(), 3);
        assert_eq!(feed.current().unwrap().id, "b");

        assert_eq!(feed.swipe(true).await.unwrap(), Some(MatchOutcome::NoMatch));
        assert_eq!(feed.current().unwrap().id, "c");
        assert_eq!(feed.swipe(false).await.unwrap(), None);
        assert_eq!(feed.remaining(), 1);
        assert!(store.get("swipes/me/c").await.unwrap().is_some());

        // Liked "b" is now excluded; passed "c" comes back.
        feed.refresh().await.unwrap();
        assert_eq!(ids(feed.candidates()), vec!["c", "d"]);

        feed.swipe(true).await.unwrap();
        feed.swipe(true).await.unwrap();
        assert_eq!(feed.swipe(true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_feed_search_text() {
        let (_store, mut feed) = feed_fixture().await;
        feed.set_search_text("CLE");
        feed.refresh().await.unwrap();
        assert_eq!(ids(feed.candidates()), vec!["c"]);
    }

    #[tokio::test]
    async fn test_pause_and_resume_listener() {
        let (store, mut feed) = feed_fixture().await;
        feed.resume().await.unwrap();
        assert!(feed.is_listening());
        assert_eq!(store.listener_count(), 1);
        assert_eq!(feed.candidates().len(), 3);

        store
            .set("users/e", json!({"username": "eve", "gender": "woman", "birthDate": "1995-01-01"}))
            .await
            .unwrap();
        assert!(feed.next_change().await.unwrap());
        assert_eq!(feed.candidates().len(), 4);

        feed.pause();
        assert!(!feed.is_listening());
        assert_eq!(store.listener_count(), 0);
        assert!(!feed.next_change().await.unwrap());
    }
}
