// =============================================================================
// Kindred Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// STORE PATH ROOTS
// =============================================================================

/// One-sided swipe decisions: `swipes/{actorId}/{targetId}`
pub const SWIPES_ROOT: &str = "swipes";

/// Outgoing like markers: `likesGiven/{giverId}/{receiverId}`
pub const LIKES_GIVEN_ROOT: &str = "likesGiven";

/// Incoming like markers: `likesReceived/{receiverId}/{giverId}`
pub const LIKES_RECEIVED_ROOT: &str = "likesReceived";

/// Symmetric match records: `matches/{userId}/{otherId}`
pub const MATCHES_ROOT: &str = "matches";

/// Profiles, owned by the registration/profile screens: `users/{userId}`
pub const USERS_ROOT: &str = "users";

/// Standing discovery preferences: `datingFilters/{userId}`
pub const DATING_FILTERS_ROOT: &str = "datingFilters";

/// Up/down vote tallies: `votes/{postId}`
pub const VOTES_ROOT: &str = "votes";

// =============================================================================
// EXCLUSION WINDOW
// =============================================================================

/// How long a given like keeps the receiver out of the giver's discovery feed
pub const LIKE_EXCLUSION_WINDOW_MS: i64 = 7 * 24 * 3600 * 1000;

// =============================================================================
// DISCOVERY FILTER DEFAULTS
// =============================================================================

/// Distance value meaning "no distance bound". Any negative value is global.
pub const GLOBAL_DISTANCE_SENTINEL: i32 = -1;

/// Default lower age bound for a user that never saved filters
pub const DEFAULT_AGE_START: u32 = 18;

/// Default upper age bound for a user that never saved filters
pub const DEFAULT_AGE_END: u32 = 99;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Expo-compatible push endpoint used when `PUSH_API_URL` is not set
pub const DEFAULT_PUSH_API_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Timeout for a single push delivery request
pub const PUSH_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Capacity of the in-process match event broadcast channel
pub const MATCH_EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// MATCH SWEEPER
// =============================================================================

/// Default seconds between sweeper passes
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// =============================================================================
// POSTGRES STORE
// =============================================================================

/// NOTIFY channel the `kv_records` trigger publishes changed paths on
pub const KV_CHANGES_CHANNEL: &str = "kv_changes";

/// Default pool size if `DB_MAX_CONNECTIONS` is not set
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;
