//! Single consumer executing queued persistence operations in order.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};
use trail_protocol::keys;
use trail_protocol::{Session, TrackingState};

use super::{KeyValueStore, PersistOp, StoreError};
use crate::config::PersistConfig;

/// Drains the bridge queue. Spawn [`run`](Self::run) on the runtime.
pub struct PersistenceWorker {
	rx: mpsc::UnboundedReceiver<PersistOp>,
	store: Arc<dyn KeyValueStore>,
	config: PersistConfig,
	/// Finalized sessions whose append failed; retried ahead of later work.
	backlog: VecDeque<Session>,
}

impl PersistenceWorker {
	pub(super) fn new(rx: mpsc::UnboundedReceiver<PersistOp>, store: Arc<dyn KeyValueStore>, config: PersistConfig) -> Self {
		Self {
			rx,
			store,
			config,
			backlog: VecDeque::new(),
		}
	}

	/// Processes operations until every [`PersistenceBridge`](super::PersistenceBridge)
	/// handle is dropped.
	pub async fn run(mut self) {
		debug!(target = "trail.persist", "persistence worker started");
		let mut pending: Option<PersistOp> = None;

		loop {
			let op = match pending.take() {
				Some(op) => op,
				None => match self.rx.recv().await {
					Some(op) => op,
					None => break,
				},
			};

			let op = match op {
				PersistOp::SaveTracking(state) => {
					let (latest, next) = self.coalesce(state);
					pending = next;
					PersistOp::SaveTracking(latest)
				}
				other => other,
			};

			self.process(op).await;
		}

		self.drain_backlog().await;
		if !self.backlog.is_empty() {
			error!(
				target = "trail.persist",
				sessions = self.backlog.len(),
				"worker stopping with unsaved finalized sessions"
			);
		}
		debug!(target = "trail.persist", "persistence worker stopped");
	}

	/// Collapses consecutive queued snapshots into the newest one. Returns the
	/// first non-snapshot operation found, if any.
	fn coalesce(&mut self, mut latest: TrackingState) -> (TrackingState, Option<PersistOp>) {
		let mut skipped = 0usize;
		loop {
			match self.rx.try_recv() {
				Ok(PersistOp::SaveTracking(next)) => {
					latest = next;
					skipped += 1;
				}
				Ok(other) => {
					if skipped > 0 {
						trace!(target = "trail.persist", skipped, "coalesced tracking snapshots");
					}
					return (latest, Some(other));
				}
				Err(_) => {
					if skipped > 0 {
						trace!(target = "trail.persist", skipped, "coalesced tracking snapshots");
					}
					return (latest, None);
				}
			}
		}
	}

	async fn process(&mut self, op: PersistOp) {
		let shared = Arc::clone(&self.store);
		let store = shared.as_ref();
		match op {
			PersistOp::SaveTracking(state) => {
				self.drain_backlog().await;
				let state = &state;
				let result = with_retry(&self.config, "save tracking state", || async move { save_tracking(store, state).await }).await;
				match result {
					Ok(()) => trace!(target = "trail.persist", actions = state.actions.len(), "tracking state saved"),
					// The next snapshot supersedes this one.
					Err(err) => error!(target = "trail.persist", error = %err, "dropping tracking snapshot"),
				}
			}
			PersistOp::ClearTracking => {
				self.drain_backlog().await;
				if let Err(err) = with_retry(&self.config, "clear tracking state", || clear_tracking(store)).await {
					error!(target = "trail.persist", error = %err, "failed to clear tracking state");
				}
			}
			PersistOp::AppendHistory(session) => {
				self.backlog.push_back(*session);
				self.drain_backlog_with_retry().await;
			}
			PersistOp::Load(reply) => {
				let _ = reply.send(with_retry(&self.config, "load tracking state", || load_tracking(store)).await);
			}
			PersistOp::History(reply) => {
				let _ = reply.send(with_retry(&self.config, "load session history", || load_history(store)).await);
			}
			PersistOp::Flush(reply) => {
				self.drain_backlog().await;
				let _ = reply.send(());
			}
		}
	}

	/// Appends backlogged sessions in order, one attempt each, stopping at the
	/// first failure.
	async fn drain_backlog(&mut self) {
		while let Some(session) = self.backlog.front() {
			match append_session(self.store.as_ref(), session).await {
				Ok(()) => {
					debug!(target = "trail.persist", user_id = %session.user_id, "backlogged session appended");
					self.backlog.pop_front();
				}
				Err(err) => {
					debug!(target = "trail.persist", error = %err, pending = self.backlog.len(), "history backlog still failing");
					return;
				}
			}
		}
	}

	/// Like [`drain_backlog`](Self::drain_backlog) but each session gets the
	/// full retry policy.
	async fn drain_backlog_with_retry(&mut self) {
		let store = self.store.as_ref();
		while let Some(session) = self.backlog.front() {
			let result = with_retry(&self.config, "append session history", || async move { append_session(store, session).await }).await;
			match result {
				Ok(()) => {
					debug!(
						target = "trail.persist",
						user_id = %session.user_id,
						actions = session.actions.len(),
						"session appended to history"
					);
					self.backlog.pop_front();
				}
				Err(err) => {
					error!(
						target = "trail.persist",
						error = %err,
						pending = self.backlog.len(),
						"history append failed; keeping session queued"
					);
					return;
				}
			}
		}
	}
}

/// Runs `attempt` until it succeeds, fails permanently, or the policy's
/// attempts are used up.
async fn with_retry<T, F, Fut>(config: &PersistConfig, operation: &'static str, mut attempt: F) -> Result<T, StoreError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, StoreError>>,
{
	let mut tries = 1;
	loop {
		match attempt().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && tries < config.max_attempts => {
				let delay = config.backoff(tries);
				warn!(
					target = "trail.persist",
					operation,
					attempt = tries,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"store operation failed; retrying"
				);
				tokio::time::sleep(delay).await;
				tries += 1;
			}
			Err(err) => return Err(err),
		}
	}
}

fn decode<T: DeserializeOwned>(entries: &mut Map<String, Value>, key: &str) -> Result<Option<T>, StoreError> {
	match entries.remove(key) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => serde_json::from_value(value).map(Some).map_err(|err| StoreError::Malformed {
			key: key.to_string(),
			message: err.to_string(),
		}),
	}
}

async fn save_tracking(store: &dyn KeyValueStore, state: &TrackingState) -> Result<(), StoreError> {
	let mut entries = Map::new();
	entries.insert(keys::IS_TRACKING.into(), json!(state.is_tracking));
	if let Some(user_id) = &state.user_id {
		entries.insert(keys::USER_ID.into(), json!(user_id));
	}
	if let Some(start) = state.session_start {
		entries.insert(keys::SESSION_START.into(), json!(start));
	}
	entries.insert(keys::SESSION_DATA.into(), serde_json::to_value(&state.actions)?);
	store.set(entries).await
}

async fn clear_tracking(store: &dyn KeyValueStore) -> Result<(), StoreError> {
	let mut entries = Map::new();
	entries.insert(keys::IS_TRACKING.into(), json!(false));
	store.set(entries).await?;
	store.remove(&[keys::SESSION_START, keys::SESSION_DATA]).await
}

async fn append_session(store: &dyn KeyValueStore, session: &Session) -> Result<(), StoreError> {
	let mut history = load_history(store).await?;
	history.push(session.clone());

	let mut entries = Map::new();
	entries.insert(keys::LAST_SESSION.into(), serde_json::to_value(session)?);
	entries.insert(keys::SESSION_HISTORY.into(), serde_json::to_value(&history)?);
	store.set(entries).await
}

async fn load_tracking(store: &dyn KeyValueStore) -> Result<TrackingState, StoreError> {
	let mut entries = store.get(&keys::TRACKING_KEYS).await?;
	Ok(TrackingState {
		is_tracking: decode(&mut entries, keys::IS_TRACKING)?.unwrap_or(false),
		user_id: decode(&mut entries, keys::USER_ID)?,
		session_start: decode(&mut entries, keys::SESSION_START)?,
		actions: decode(&mut entries, keys::SESSION_DATA)?.unwrap_or_default(),
	})
}

async fn load_history(store: &dyn KeyValueStore) -> Result<Vec<Session>, StoreError> {
	let mut entries = store.get(&[keys::SESSION_HISTORY]).await?;
	Ok(decode(&mut entries, keys::SESSION_HISTORY)?.unwrap_or_default())
}
