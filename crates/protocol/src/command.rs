//! Cross-context command channel.

use serde::{Deserialize, Serialize};

pub const STATUS_TRACKING_STARTED: &str = "tracking started";
pub const STATUS_ALREADY_TRACKING: &str = "already tracking";
pub const STATUS_TRACKING_STOPPED: &str = "tracking stopped";
pub const STATUS_NOT_TRACKING: &str = "not tracking";

/// Request sent by a controlling context (panel, CLI) to the capture context.
///
/// Wire format: `{"action": "start-tracking"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum CommandRequest {
	StartTracking,
	StopTracking,
}

impl CommandRequest {
	pub fn name(&self) -> &'static str {
		match self {
			CommandRequest::StartTracking => "start-tracking",
			CommandRequest::StopTracking => "stop-tracking",
		}
	}
}

/// Response to a [`CommandRequest`]. Every request gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
}

impl CommandResponse {
	pub fn started(user_id: impl Into<String>) -> Self {
		Self {
			status: STATUS_TRACKING_STARTED.to_string(),
			user_id: Some(user_id.into()),
		}
	}

	pub fn already_tracking(user_id: impl Into<String>) -> Self {
		Self {
			status: STATUS_ALREADY_TRACKING.to_string(),
			user_id: Some(user_id.into()),
		}
	}

	pub fn stopped() -> Self {
		Self {
			status: STATUS_TRACKING_STOPPED.to_string(),
			user_id: None,
		}
	}

	pub fn not_tracking() -> Self {
		Self {
			status: STATUS_NOT_TRACKING.to_string(),
			user_id: None,
		}
	}

	/// Delivery failure surfaced to the sender. Tracking state is untouched.
	pub fn delivery_failed(reason: impl std::fmt::Display) -> Self {
		Self {
			status: format!("error: {reason}"),
			user_id: None,
		}
	}

	pub fn is_error(&self) -> bool {
		self.status.starts_with("error:")
	}
}
