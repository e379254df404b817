//! Key names in the external key-value store.

/// Tracking flag (`bool`).
pub const IS_TRACKING: &str = "isTracking";
/// Stable user identifier (`string`).
pub const USER_ID: &str = "userId";
/// Start of the in-progress session (`u64`, ms since epoch).
pub const SESSION_START: &str = "sessionStart";
/// In-progress action sequence (`Action[]`).
pub const SESSION_DATA: &str = "sessionData";
/// Most recently finalized session (`Session`).
pub const LAST_SESSION: &str = "lastSession";
/// All finalized sessions, oldest first (`Session[]`).
pub const SESSION_HISTORY: &str = "sessionHistory";

/// Keys making up the tracking-state projection.
pub const TRACKING_KEYS: [&str; 4] = [IS_TRACKING, USER_ID, SESSION_START, SESSION_DATA];
