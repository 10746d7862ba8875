use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Location;
use crate::store::{RemoteStore, StoreResult, get_json, paths};

/// Last-known position lookup. `None` means the location is unavailable.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn get_location(&self, user_id: &str) -> StoreResult<Option<Location>>;
}

/// Reads the location the client app writes to `users/{id}/location`.
#[derive(Clone)]
pub struct StoreLocationProvider {
    store: Arc<dyn RemoteStore>,
}

impl StoreLocationProvider {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LocationProvider for StoreLocationProvider {
    async fn get_location(&self, user_id: &str) -> StoreResult<Option<Location>> {
        paths::validate_key(user_id)?;
        match get_json::<Location>(self.store.as_ref(), &paths::user_location(user_id)).await {
            Ok(location) => Ok(location),
            Err(crate::store::StoreError::Decode { path, source }) => {
                tracing::debug!("Ignoring unreadable location at {}: {}", path, source);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_location_present_missing_and_malformed() {
        let store = MemoryStore::new();
        store.set("users/a/location", json!({"latitude": 1.5, "longitude": 2.5})).await.unwrap();
        store.set("users/b/location", json!("somewhere")).await.unwrap();
        let provider = StoreLocationProvider::new(Arc::new(store));

        let location = provider.get_location("a").await.unwrap().unwrap();
        assert_eq!((location.latitude, location.longitude), (1.5, 2.5));
        assert_eq!(provider.get_location("b").await.unwrap(), None);
        assert_eq!(provider.get_location("c").await.unwrap(), None);
    }
}
