pub mod profiles;
pub mod swipes;
pub mod votes;

pub use profiles::{DatingFilters, Location, Profile};
pub use swipes::{MatchEvent, MatchOutcome, NotificationKind, SwipeRecord};
pub use votes::{VoteDirection, VoteTally};
