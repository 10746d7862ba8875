use std::sync::Arc;

use crate::dating::{MatchDetector, SwipeRecorder};
use crate::db::{DatabaseConfig, PgStore, get_db_pool, migrations::run_migrations};
use crate::services::{LocationProvider, LogNotifier, Notifier, PushNotifier, StoreLocationProvider};
use crate::store::{MemoryStore, RemoteStore};
use crate::utils::Config;

/// Handles shared by every request. All collaborators are injected here
/// rather than reached through globals.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RemoteStore>,
    pub recorder: Arc<SwipeRecorder>,
    pub locations: Arc<dyn LocationProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        let detector = Arc::new(MatchDetector::new(store.clone(), notifier));
        let recorder = Arc::new(SwipeRecorder::new(store.clone(), detector));
        let locations = Arc::new(StoreLocationProvider::new(store.clone()));
        Self { store, recorder, locations }
    }
}

/// Postgres when `DATABASE_URL` is set (migrating it first), otherwise an
/// in-memory store that lives as long as the process.
pub async fn open_store() -> anyhow::Result<Arc<dyn RemoteStore>> {
    match DatabaseConfig::from_env_optional() {
        Some(db_config) => {
            let pool = get_db_pool(&db_config).await?;
            run_migrations(&pool).await?;
            tracing::info!("Using Postgres store");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Postgres only. A sweep over a fresh in-memory store would see an empty
/// tree and report success forever.
pub async fn open_persistent_store(db_config: Option<DatabaseConfig>) -> anyhow::Result<Arc<dyn RemoteStore>> {
    let db_config = db_config.ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = get_db_pool(&db_config).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

pub fn build_notifier(store: Arc<dyn RemoteStore>, config: &Config) -> Arc<dyn Notifier> {
    if config.push_enabled {
        tracing::info!("Push notifications via {}", config.push_api_url);
        Arc::new(PushNotifier::new(store, config.push_api_url.clone(), config.push_access_token.clone()))
    } else {
        Arc::new(LogNotifier)
    }
}
