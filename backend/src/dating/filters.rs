use crate::models::DatingFilters;
use crate::store::{RemoteStore, get_json, paths, set_json};

use super::DatingError;

/// Reads `user_id`'s standing filters, falling back to defaults when none
/// are saved or the read fails.
pub async fn load_filters(store: &dyn RemoteStore, user_id: &str) -> DatingFilters {
    match get_json::<DatingFilters>(store, &paths::dating_filters(user_id)).await {
        Ok(Some(filters)) => filters,
        Ok(None) => DatingFilters::default(),
        Err(e) => {
            tracing::warn!("Using default dating filters for {}: {}", user_id, e);
            DatingFilters::default()
        }
    }
}

pub async fn save_filters(store: &dyn RemoteStore, user_id: &str, filters: &DatingFilters) -> Result<(), DatingError> {
    paths::validate_key(user_id)?;
    if filters.age_start > filters.age_end {
        return Err(DatingError::InvalidFilters(format!(
            "age range {}-{} is empty",
            filters.age_start, filters.age_end
        )));
    }
    set_json(store, &paths::dating_filters(user_id), filters).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_load_defaults_when_missing() {
        let store = MemoryStore::new();
        assert_eq!(load_filters(&store, "a").await, DatingFilters::default());

        store.fail_under("datingFilters");
        assert_eq!(load_filters(&store, "a").await, DatingFilters::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let store = MemoryStore::new();
        let mut filters = DatingFilters { age_start: 21, age_end: 30, distance: 25, ..Default::default() };
        filters.set_genders(["woman"]);

        save_filters(&store, "a", &filters).await.unwrap();
        assert_eq!(load_filters(&store, "a").await, filters);
    }

    #[tokio::test]
    async fn test_save_rejects_inverted_age_range() {
        let store = MemoryStore::new();
        let filters = DatingFilters { age_start: 40, age_end: 30, ..Default::default() };
        assert!(matches!(
            save_filters(&store, "a", &filters).await,
            Err(DatingError::InvalidFilters(_))
        ));
    }
}
