use serde::{Deserialize, Serialize};

/// One-sided decision stored at `swipes/{actorId}/{targetId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub liked: bool,
    pub timestamp: i64,
}

/// The two profiles that just matched, as seen by the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub user_id: String,
    pub matched_user_id: String,
    pub matched_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum MatchOutcome {
    /// Counterpart has not liked the actor yet; a like notification went out.
    NoMatch,
    /// This call created the match.
    NewMatch(MatchEvent),
    /// Counterpart liked the actor and the match already existed.
    AlreadyLiked,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Match,
}

impl NotificationKind {
    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::Like => "Someone likes you",
            NotificationKind::Match => "It's a match!",
        }
    }
}
