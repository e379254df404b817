//! Session and tracking-state shapes.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// One recording interval.
///
/// `session_end` is `Some` exactly when the session has been finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub user_id: String,
	pub session_start: u64,
	#[serde(default)]
	pub session_end: Option<u64>,
	#[serde(default)]
	pub actions: Vec<Action>,
}

impl Session {
	pub fn is_finalized(&self) -> bool {
		self.session_end.is_some()
	}

	/// Recording length in milliseconds, once finalized.
	pub fn duration_ms(&self) -> Option<u64> {
		self.session_end.map(|end| end.saturating_sub(self.session_start))
	}
}

/// Persisted projection of the in-progress session.
///
/// Stored as separate keys (see [`crate::keys`]); this struct is the
/// assembled view used for restoration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingState {
	#[serde(default)]
	pub is_tracking: bool,
	#[serde(default)]
	pub user_id: Option<String>,
	#[serde(default)]
	pub session_start: Option<u64>,
	#[serde(default)]
	pub actions: Vec<Action>,
}

impl TrackingState {
	/// Returns true when the snapshot describes an interrupted active session.
	pub fn is_resumable(&self) -> bool {
		self.is_tracking
	}
}
