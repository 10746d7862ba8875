pub mod discovery;
pub mod swipes;
pub mod votes;

use axum::{
    Router,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::dating::DatingError;
use crate::state::AppState;
use crate::store::StoreError;

pub use discovery::{get_discovery, get_exclusions, get_filters, put_filters};
pub use swipes::record_swipe;
pub use votes::{cast_vote, get_votes};

pub type ApiError = (StatusCode, Json<Value>);

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/swipes", post(record_swipe))
        .route("/api/users/{user_id}/discovery", get(get_discovery))
        .route("/api/users/{user_id}/exclusions", get(get_exclusions))
        .route("/api/users/{user_id}/filters", get(get_filters).put(put_filters))
        .route("/api/posts/{post_id}/votes", get(get_votes).post(cast_vote))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::InvalidPath(_) => error_body(StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            tracing::error!("Store request failed: {}", other);
            error_body(StatusCode::BAD_GATEWAY, "Store unavailable")
        }
    }
}

pub(crate) fn dating_error(e: DatingError) -> ApiError {
    match e {
        DatingError::SelfSwipe | DatingError::InvalidFilters(_) => error_body(StatusCode::BAD_REQUEST, e.to_string()),
        DatingError::Store(e) => store_error(e),
    }
}
