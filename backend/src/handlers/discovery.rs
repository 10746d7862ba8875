use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::dating::{self, DiscoveryFeed};
use crate::models::{DatingFilters, Profile};
use crate::state::AppState;
use crate::store::paths;
use crate::utils::now_millis;
use super::{ApiError, dating_error, store_error};

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub candidates: Vec<Profile>,
}

#[derive(Debug, Serialize)]
pub struct ExclusionsResponse {
    pub excluded: Vec<String>,
}

pub async fn get_discovery(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<DiscoveryQuery>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let mut feed = DiscoveryFeed::new(
        user_id,
        state.store.clone(),
        state.recorder.clone(),
        state.locations.clone(),
    );
    feed.set_search_text(query.search);
    feed.refresh().await.map_err(dating_error)?;

    Ok(Json(DiscoveryResponse { candidates: feed.candidates().to_vec() }))
}

pub async fn get_exclusions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ExclusionsResponse>, ApiError> {
    paths::validate_key(&user_id).map_err(store_error)?;

    let mut excluded: Vec<String> = dating::compute_exclusions(state.store.as_ref(), &user_id, now_millis())
        .await
        .into_iter()
        .collect();
    excluded.sort();
    Ok(Json(ExclusionsResponse { excluded }))
}

pub async fn get_filters(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DatingFilters>, ApiError> {
    paths::validate_key(&user_id).map_err(store_error)?;
    Ok(Json(dating::load_filters(state.store.as_ref(), &user_id).await))
}

pub async fn put_filters(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(filters): Json<DatingFilters>,
) -> Result<Json<DatingFilters>, ApiError> {
    dating::save_filters(state.store.as_ref(), &user_id, &filters)
        .await
        .map_err(dating_error)?;
    tracing::info!("Updated dating filters for {}", user_id);
    Ok(Json(filters))
}
