//! Swipe/match reconciliation.
//!
//! A like writes a one-sided [`SwipeRecord`](crate::models::SwipeRecord)
//! plus like markers, then the [`MatchDetector`] checks for the reverse like
//! and promotes the pair into a symmetric match. Discovery hides matched and
//! recently liked users and applies the standing [`DatingFilters`](crate::models::DatingFilters).

pub mod detector;
pub mod discovery;
pub mod exclusions;
pub mod filters;
pub mod recorder;
pub mod sweeper;

use thiserror::Error;

use crate::store::StoreError;

pub use detector::MatchDetector;
pub use discovery::{DiscoveryContext, DiscoveryFeed, filter_candidates, haversine_km};
pub use exclusions::compute_exclusions;
pub use filters::{load_filters, save_filters};
pub use recorder::SwipeRecorder;
pub use sweeper::{SweepReport, find_mutual_likes, sweep_mutual_likes};

#[derive(Debug, Error)]
pub enum DatingError {
    #[error("A user cannot swipe on themselves")]
    SelfSwipe,

    #[error("Invalid dating filters: {0}")]
    InvalidFilters(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
