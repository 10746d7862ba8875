use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use crate::models::MatchOutcome;
use crate::state::AppState;
use super::{ApiError, dating_error};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub actor_id: String,
    pub target_id: String,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub recorded: bool,
    /// Present for likes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchOutcome>,
}

pub async fn record_swipe(
    State(state): State<AppState>,
    Json(req): Json<SwipeRequest>,
) -> Result<Json<SwipeResponse>, ApiError> {
    let result = state
        .recorder
        .record_swipe(&req.actor_id, &req.target_id, req.liked)
        .await
        .map_err(dating_error)?;

    Ok(Json(SwipeResponse { recorded: true, result }))
}
