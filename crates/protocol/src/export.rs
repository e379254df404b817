//! Exported session document shape.

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;

/// One exported session: `{user_id, session_start, session_end, actions}`.
///
/// Timestamps are RFC 3339 strings; conversion from [`crate::Session`]
/// lives in the capture core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
	pub user_id: String,
	pub session_start: String,
	pub session_end: Option<String>,
	pub actions: Vec<ExportAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportAction {
	pub timestamp: String,
	pub url: String,
	#[serde(flatten)]
	pub kind: ActionKind,
}
