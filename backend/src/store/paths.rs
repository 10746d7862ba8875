use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::*;
use super::{StoreError, StoreResult};

/// Characters the store refuses inside a single key.
static FORBIDDEN_KEY_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[./#$\[\]]").expect("static regex"));

/// Validates a single path segment such as a user id.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.trim().is_empty() || FORBIDDEN_KEY_CHARS.is_match(key) {
        return Err(StoreError::InvalidPath(key.to_string()));
    }
    Ok(())
}

/// Splits a full path into validated segments. The empty path is the root.
pub fn segments(path: &str) -> StoreResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    for part in &parts {
        if part.trim().is_empty() || FORBIDDEN_KEY_CHARS.is_match(part) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
    }
    Ok(parts)
}

/// Canonical form: segments joined by `/` without leading or trailing slash.
pub fn normalize_path(path: &str) -> StoreResult<String> {
    Ok(segments(path)?.join("/"))
}

/// True when a write at one path can change the value seen at the other.
pub fn overlaps(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b || is_ancestor(a, b) || is_ancestor(b, a)
}

/// True when `ancestor` is a strict prefix of `path` on a segment boundary.
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

pub fn swipe(actor_id: &str, target_id: &str) -> String {
    format!("{}/{}/{}", SWIPES_ROOT, actor_id, target_id)
}

pub fn like_given(giver_id: &str, receiver_id: &str) -> String {
    format!("{}/{}/{}", LIKES_GIVEN_ROOT, giver_id, receiver_id)
}

pub fn likes_given_by(giver_id: &str) -> String {
    format!("{}/{}", LIKES_GIVEN_ROOT, giver_id)
}

pub fn like_received(receiver_id: &str, giver_id: &str) -> String {
    format!("{}/{}/{}", LIKES_RECEIVED_ROOT, receiver_id, giver_id)
}

pub fn match_record(user_id: &str, other_id: &str) -> String {
    format!("{}/{}/{}", MATCHES_ROOT, user_id, other_id)
}

pub fn matches_of(user_id: &str) -> String {
    format!("{}/{}", MATCHES_ROOT, user_id)
}

pub fn user(user_id: &str) -> String {
    format!("{}/{}", USERS_ROOT, user_id)
}

pub fn user_location(user_id: &str) -> String {
    format!("{}/{}/location", USERS_ROOT, user_id)
}

pub fn dating_filters(user_id: &str) -> String {
    format!("{}/{}", DATING_FILTERS_ROOT, user_id)
}

pub fn votes(post_id: &str) -> String {
    format!("{}/{}", VOTES_ROOT, post_id)
}
