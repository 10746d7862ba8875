use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// Counters and voter map for one post, updated as a single record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteTally {
    pub upvotes: u64,
    pub downvotes: u64,
    pub voters: BTreeMap<String, VoteDirection>,
}

impl VoteTally {
    /// Applies a vote: a new vote counts, repeating it retracts, the opposite
    /// direction moves it.
    pub fn apply(&mut self, user_id: &str, direction: VoteDirection) {
        match self.voters.get(user_id).copied() {
            Some(previous) if previous == direction => {
                self.voters.remove(user_id);
                self.decrement(direction);
            }
            Some(previous) => {
                self.decrement(previous);
                self.increment(direction);
                self.voters.insert(user_id.to_string(), direction);
            }
            None => {
                self.increment(direction);
                self.voters.insert(user_id.to_string(), direction);
            }
        }
    }

    pub fn vote_of(&self, user_id: &str) -> Option<VoteDirection> {
        self.voters.get(user_id).copied()
    }

    fn increment(&mut self, direction: VoteDirection) {
        match direction {
            VoteDirection::Up => self.upvotes += 1,
            VoteDirection::Down => self.downvotes += 1,
        }
    }

    fn decrement(&mut self, direction: VoteDirection) {
        match direction {
            VoteDirection::Up => self.upvotes = self.upvotes.saturating_sub(1),
            VoteDirection::Down => self.downvotes = self.downvotes.saturating_sub(1),
        }
    }
}
