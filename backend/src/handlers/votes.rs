use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;

use crate::models::{VoteDirection, VoteTally};
use crate::state::AppState;
use crate::votes;
use super::{ApiError, store_error};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub user_id: String,
    pub direction: VoteDirection,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteTally>, ApiError> {
    let tally = votes::cast_vote(state.store.as_ref(), &post_id, &req.user_id, req.direction)
        .await
        .map_err(store_error)?;
    Ok(Json(tally))
}

pub async fn get_votes(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<VoteTally>, ApiError> {
    let tally = votes::get_tally(state.store.as_ref(), &post_id)
        .await
        .map_err(store_error)?;
    Ok(Json(tally))
}
