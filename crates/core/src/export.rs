//! Conversion of finalized sessions into export documents.
//!
//! Export only reads sessions that are already finalized; it never touches
//! the store or the in-progress session.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;
use trail_protocol::{ExportAction, ExportDocument, Session};

use crate::error::{Result, TrailError};

/// A rendered export ready to be written or packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
	pub file_name: String,
	pub contents: String,
}

fn datetime(ms: u64) -> Result<DateTime<Utc>> {
	i64::try_from(ms)
		.ok()
		.and_then(DateTime::<Utc>::from_timestamp_millis)
		.ok_or_else(|| TrailError::Export(format!("timestamp {ms} is out of range")))
}

fn rfc3339(ms: u64) -> Result<String> {
	Ok(datetime(ms)?.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Builds the export document for a finalized session.
pub fn export_document(session: &Session) -> Result<ExportDocument> {
	let Some(session_end) = session.session_end else {
		return Err(TrailError::Export(format!(
			"session of user {} started at {} is not finalized",
			session.user_id, session.session_start
		)));
	};

	let actions = session
		.actions
		.iter()
		.map(|action| {
			Ok(ExportAction {
				timestamp: rfc3339(action.timestamp)?,
				url: action.url.clone(),
				kind: action.kind.clone(),
			})
		})
		.collect::<Result<Vec<_>>>()?;

	Ok(ExportDocument {
		user_id: session.user_id.clone(),
		session_start: rfc3339(session.session_start)?,
		session_end: Some(rfc3339(session_end)?),
		actions,
	})
}

/// `session_<user_id>_<YYYY-MM-DDTHH-MM-SS-mmmZ>.json`, keyed on the session
/// start. Characters outside `[A-Za-z0-9_-]` in the user id become `_`.
pub fn export_filename(session: &Session) -> Result<String> {
	let user: String = session
		.user_id
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
		.collect();
	let user = if user.is_empty() { "anonymous".to_string() } else { user };
	let stamp = datetime(session.session_start)?.format("%Y-%m-%dT%H-%M-%S-%3fZ");
	Ok(format!("session_{user}_{stamp}.json"))
}

/// Pretty-printed JSON for one document.
pub fn render_document(document: &ExportDocument) -> Result<String> {
	Ok(serde_json::to_string_pretty(document)?)
}

/// Renders every session into its own file. Colliding names get a `-<n>`
/// suffix so no document overwrites another inside one batch.
pub fn export_batch(sessions: &[Session]) -> Result<Vec<ExportedFile>> {
	let mut seen: HashMap<String, usize> = HashMap::new();
	let mut files = Vec::with_capacity(sessions.len());

	for session in sessions {
		let base = export_filename(session)?;
		let count = seen.entry(base.clone()).or_default();
		*count += 1;
		let file_name = match *count {
			1 => base,
			n => format!("{}-{n}.json", base.trim_end_matches(".json")),
		};
		let contents = render_document(&export_document(session)?)?;
		files.push(ExportedFile { file_name, contents });
	}

	debug!(target = "trail.export", files = files.len(), "sessions exported");
	Ok(files)
}

#[cfg(test)]
mod tests {
	use trail_protocol::{Action, ActionKind, PointerMove};

	use super::*;

	fn session(user_id: &str, start: u64) -> Session {
		Session {
			user_id: user_id.into(),
			session_start: start,
			session_end: Some(start + 2_500),
			actions: vec![
				Action::new(start, "https://example.com/", ActionKind::SessionStarted),
				Action::new(start + 10, "https://example.com/", ActionKind::PointerMove(PointerMove { x: 4.0, y: 8.5 })),
				Action::new(start + 2_500, "https://example.com/", ActionKind::SessionStopped),
			],
		}
	}

	// 2024-03-05T06:07:08.009Z
	const START: u64 = 1_709_618_828_009;

	#[test]
	fn document_uses_rfc3339_timestamps() {
		let doc = export_document(&session("u1", START)).unwrap();
		assert_eq!(doc.session_start, "2024-03-05T06:07:08.009Z");
		assert_eq!(doc.session_end.as_deref(), Some("2024-03-05T06:07:10.509Z"));
		assert_eq!(doc.actions[1].timestamp, "2024-03-05T06:07:08.019Z");
	}

	#[test]
	fn rendered_actions_are_flat() {
		let rendered = render_document(&export_document(&session("u1", START)).unwrap()).unwrap();
		let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
		let action = &value["actions"][1];
		assert_eq!(action["type"], "pointer_move");
		assert_eq!(action["x"], 4.0);
		assert_eq!(value["user_id"], "u1");
	}

	#[test]
	fn unfinalized_session_is_rejected() {
		let mut open = session("u1", START);
		open.session_end = None;
		assert!(matches!(export_document(&open), Err(TrailError::Export(_))));
	}

	#[test]
	fn filename_is_filesystem_safe() {
		let name = export_filename(&session("a/b c", START)).unwrap();
		assert_eq!(name, "session_a_b_c_2024-03-05T06-07-08-009Z.json");
	}

	#[test]
	fn batch_disambiguates_collisions() {
		let files = export_batch(&[session("u1", START), session("u1", START), session("u2", START)]).unwrap();
		let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
		assert_eq!(
			names,
			vec![
				"session_u1_2024-03-05T06-07-08-009Z.json",
				"session_u1_2024-03-05T06-07-08-009Z-2.json",
				"session_u2_2024-03-05T06-07-08-009Z.json",
			]
		);
	}
}
