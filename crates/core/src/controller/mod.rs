//! The start/stop/restore state machine.
//!
//! A [`SessionController`] owns everything that used to be ambient page state:
//! the tracking flag, the user id lineage, and the in-progress action
//! sequence. Every mutation is written through the [`PersistenceBridge`]
//! without waiting, so an abrupt reload loses at most the newest action.
//!
//! Restoration runs once per page load. Until it has completed, direct
//! [`start`](SessionController::start)/[`stop`](SessionController::stop)
//! calls fail with [`TrailError::NotRestored`]; external commands received
//! through [`handle_command`](SessionController::handle_command) restore
//! first, which defers an early stop until the interrupted session has been
//! adopted.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::{debug, info, warn};
use trail_protocol::{Action, ActionKind, CommandRequest, CommandResponse, Session, TrackingState};
use uuid::Uuid;

use crate::capture::{EventCapture, EventHost, RawEvent};
use crate::clock::Clock;
use crate::config::CaptureConfig;
use crate::element::Element;
use crate::error::{Result, TrailError};
use crate::persist::PersistenceBridge;

/// The in-progress recording interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
	user_id: String,
	session_start: u64,
	actions: Vec<Action>,
}

impl ActiveSession {
	pub fn user_id(&self) -> &str {
		&self.user_id
	}

	pub fn session_start(&self) -> u64 {
		self.session_start
	}

	pub fn actions(&self) -> &[Action] {
		&self.actions
	}

	fn tracking_state(&self) -> TrackingState {
		TrackingState {
			is_tracking: true,
			user_id: Some(self.user_id.clone()),
			session_start: Some(self.session_start),
			actions: self.actions.clone(),
		}
	}

	/// Latest instant recorded in this session.
	fn high_water(&self) -> u64 {
		self.actions.last().map_or(self.session_start, |a| a.timestamp.max(self.session_start))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
	Idle,
	Tracking(ActiveSession),
}

impl SessionState {
	pub fn active(&self) -> Option<&ActiveSession> {
		match self {
			SessionState::Idle => None,
			SessionState::Tracking(session) => Some(session),
		}
	}
}

/// Result of [`SessionController::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
	/// Nothing was being tracked; the controller starts idle.
	Idle,
	/// An interrupted session was adopted with this many persisted actions.
	Resumed { actions: usize },
	/// The persisted projection could not be decoded and was ignored.
	Discarded,
	AlreadyRestored,
}

pub struct SessionController<H: EventHost> {
	host: H,
	state: SessionState,
	/// Survives stop so later sessions share the lineage.
	user_id: Option<String>,
	capture: EventCapture,
	bridge: PersistenceBridge,
	clock: Arc<dyn Clock>,
	restored: bool,
}

impl<H: EventHost> SessionController<H> {
	pub fn new(host: H, bridge: PersistenceBridge, clock: Arc<dyn Clock>, config: CaptureConfig) -> Self {
		Self {
			host,
			state: SessionState::Idle,
			user_id: None,
			capture: EventCapture::new(config),
			bridge,
			clock,
			restored: false,
		}
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	pub fn user_id(&self) -> Option<&str> {
		self.user_id.as_deref()
	}

	pub fn is_tracking(&self) -> bool {
		matches!(self.state, SessionState::Tracking(_))
	}

	pub fn is_restored(&self) -> bool {
		self.restored
	}

	pub fn bridge(&self) -> &PersistenceBridge {
		&self.bridge
	}

	/// Adopts an interrupted session from the persisted tracking state.
	///
	/// Runs once; later calls return [`RestoreOutcome::AlreadyRestored`]. A
	/// projection that fails to decode is logged and discarded so the page
	/// still comes up idle. A store that stays unreachable after the worker's
	/// retries yields an error and leaves the controller unrestored, so
	/// nothing can overwrite the persisted session before a later attempt.
	pub async fn restore(&mut self) -> Result<RestoreOutcome> {
		if self.restored {
			return Ok(RestoreOutcome::AlreadyRestored);
		}

		let persisted = match self.bridge.load().await {
			Ok(state) => state,
			Err(TrailError::Store(err)) if !err.is_transient() => {
				warn!(target = "trail.session", error = %err, "discarding unreadable tracking state");
				self.restored = true;
				return Ok(RestoreOutcome::Discarded);
			}
			Err(err) => {
				warn!(target = "trail.session", error = %err, "tracking state could not be loaded");
				return Err(err);
			}
		};
		self.restored = true;

		if persisted.user_id.is_some() {
			self.user_id = persisted.user_id.clone();
		}
		if !persisted.is_resumable() {
			debug!(target = "trail.session", "no interrupted session to restore");
			return Ok(RestoreOutcome::Idle);
		}

		let actions = persisted.actions.len();
		let user_id = self.lineage();
		let session_start = persisted
			.session_start
			.or_else(|| persisted.actions.first().map(|a| a.timestamp))
			.unwrap_or_else(|| self.clock.now_ms());

		self.state = SessionState::Tracking(ActiveSession {
			user_id: user_id.clone(),
			session_start,
			actions: persisted.actions,
		});
		self.capture.attach(&mut self.host);
		self.record(ActionKind::SessionRestored)?;

		info!(target = "trail.session", user_id = %user_id, actions, "session restored");
		Ok(RestoreOutcome::Resumed { actions })
	}

	/// Begins a session. Returns false, changing nothing, when one is already
	/// active.
	pub fn start(&mut self) -> Result<bool> {
		self.ensure_restored()?;
		if let SessionState::Tracking(session) = &self.state {
			debug!(target = "trail.session", user_id = %session.user_id, "start ignored; already tracking");
			return Ok(false);
		}

		let user_id = self.lineage();
		let session_start = self.clock.now_ms();
		let session = ActiveSession {
			user_id: user_id.clone(),
			session_start,
			actions: Vec::new(),
		};
		self.bridge.save(session.tracking_state())?;
		self.state = SessionState::Tracking(session);
		self.capture.attach(&mut self.host);
		self.record(ActionKind::SessionStarted)?;

		info!(target = "trail.session", user_id = %user_id, session_start, "tracking started");
		Ok(true)
	}

	/// Finalizes the active session and hands it to history. Returns `None`
	/// when idle.
	pub fn stop(&mut self) -> Result<Option<Session>> {
		self.ensure_restored()?;
		if !self.is_tracking() {
			debug!(target = "trail.session", "stop ignored; not tracking");
			return Ok(None);
		}

		let session_end = self.now();
		let url = self.host.location();
		let SessionState::Tracking(active) = &self.state else {
			return Ok(None);
		};
		let mut actions = active.actions.clone();
		actions.push(Action::new(session_end, url, ActionKind::SessionStopped));
		let session = Session {
			user_id: active.user_id.clone(),
			session_start: active.session_start,
			session_end: Some(session_end),
			actions,
		};

		// Nothing changes unless the finalized session was handed off.
		self.bridge.append_history(session.clone())?;
		self.state = SessionState::Idle;
		self.capture.detach(&mut self.host);
		self.bridge.clear_tracking()?;

		info!(
			target = "trail.session",
			user_id = %session.user_id,
			actions = session.actions.len(),
			duration_ms = session.duration_ms().unwrap_or_default(),
			"tracking stopped"
		);
		Ok(Some(session))
	}

	/// Feeds one host event through capture. Returns the appended action, or
	/// `None` when idle, unregistered, or throttled.
	pub fn dispatch<E: Element>(&mut self, event: RawEvent<E>) -> Result<Option<&Action>> {
		if !self.is_tracking() {
			return Ok(None);
		}
		let now = self.now();
		let url = self.host.location();
		let Some(kind) = self.capture.capture(&event, now, &url) else {
			return Ok(None);
		};
		self.record(kind)
	}

	/// Answers an external command. Always produces a response; failures are
	/// reported in its status.
	pub async fn handle_command(&mut self, request: CommandRequest) -> CommandResponse {
		debug!(target = "trail.session", command = request.name(), "command received");
		if let Err(err) = self.restore().await {
			return CommandResponse::delivery_failed(err.to_string());
		}

		match request {
			CommandRequest::StartTracking => match self.start() {
				Ok(true) => CommandResponse::started(self.lineage_ref()),
				Ok(false) => CommandResponse::already_tracking(self.lineage_ref()),
				Err(err) => CommandResponse::delivery_failed(err.to_string()),
			},
			CommandRequest::StopTracking => match self.stop() {
				Ok(Some(_)) => CommandResponse::stopped(),
				Ok(None) => CommandResponse::not_tracking(),
				Err(err) => CommandResponse::delivery_failed(err.to_string()),
			},
		}
	}

	fn ensure_restored(&self) -> Result<()> {
		if self.restored { Ok(()) } else { Err(TrailError::NotRestored) }
	}

	/// Current user id, assigning one if the lineage has none yet.
	fn lineage(&mut self) -> String {
		self.user_id.get_or_insert_with(|| Uuid::new_v4().to_string()).clone()
	}

	fn lineage_ref(&self) -> String {
		self.user_id.clone().unwrap_or_default()
	}

	/// Wall clock clamped so the active session's timestamps never decrease.
	fn now(&self) -> u64 {
		let now = self.clock.now_ms();
		match &self.state {
			SessionState::Tracking(session) => now.max(session.high_water()),
			SessionState::Idle => now,
		}
	}

	fn record(&mut self, kind: ActionKind) -> Result<Option<&Action>> {
		let timestamp = self.now();
		let url = self.host.location();
		let SessionState::Tracking(session) = &mut self.state else {
			return Ok(None);
		};
		session.actions.push(Action::new(timestamp, url, kind));
		self.bridge.save(session.tracking_state())?;
		Ok(session.actions.last())
	}
}
