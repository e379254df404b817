use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use trail::protocol::Session;

/// Result data for `status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
	pub tracking: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_start: Option<u64>,
	pub actions: usize,
	pub history_length: usize,
}

/// One finalized session without its action payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
	pub user_id: String,
	pub session_start: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_end: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	pub actions: usize,
}

impl From<&Session> for SessionSummary {
	fn from(session: &Session) -> Self {
		Self {
			user_id: session.user_id.clone(),
			session_start: session.session_start,
			session_end: session.session_end,
			duration_ms: session.duration_ms(),
			actions: session.actions.len(),
		}
	}
}

/// Result data for `history`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryData {
	pub total: usize,
	pub sessions: Vec<SessionSummary>,
}

/// Result data for `export`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
	pub out_dir: PathBuf,
	pub files: Vec<PathBuf>,
}

/// Result data for `replay`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayData {
	pub events: usize,
	pub captured: usize,
	pub skipped: usize,
	pub tracking: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub finalized: Vec<SessionSummary>,
}
