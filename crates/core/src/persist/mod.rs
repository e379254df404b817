//! Asynchronous persistence of tracking state and session history.
//!
//! [`PersistenceBridge`] is the handle the controller writes through. Every
//! request is queued on one channel and executed by a single
//! [`PersistenceWorker`], so writes reach the store in the order they were
//! issued: a later snapshot can never be overtaken and reverted by an earlier
//! one. Callers never wait on writes; reads (`load`, `history`) and `flush`
//! are answered in queue order through oneshot channels.
//!
//! # Store layout
//!
//! | key              | value                  |
//! |------------------|------------------------|
//! | `isTracking`     | `bool`                 |
//! | `userId`         | `string`               |
//! | `sessionStart`   | ms since epoch         |
//! | `sessionData`    | `Action[]`             |
//! | `lastSession`    | `Session`              |
//! | `sessionHistory` | `Session[]`            |

mod memory;
mod worker;


use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use trail_protocol::{Session, TrackingState};

pub use memory::MemoryStore;
pub use worker::PersistenceWorker;

use crate::config::PersistConfig;
use crate::error::{Result, TrailError};

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Malformed value for `{key}`: {message}")]
	Malformed { key: String, message: String },

	#[error("Store unavailable: {0}")]
	Unavailable(String),
}

impl StoreError {
	/// Failures worth retrying. Undecodable data fails the same way every time.
	pub fn is_transient(&self) -> bool {
		matches!(self, StoreError::Io(_) | StoreError::Unavailable(_))
	}
}

/// Opaque asynchronous key-value service (`chrome.storage.local`-like).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	/// Returns the entries present among `keys`. Absent keys are omitted.
	async fn get(&self, keys: &[&str]) -> std::result::Result<Map<String, Value>, StoreError>;

	/// Writes all `entries` in one operation.
	async fn set(&self, entries: Map<String, Value>) -> std::result::Result<(), StoreError>;

	async fn remove(&self, keys: &[&str]) -> std::result::Result<(), StoreError>;
}

#[derive(Debug)]
pub(crate) enum PersistOp {
	SaveTracking(TrackingState),
	ClearTracking,
	AppendHistory(Box<Session>),
	Load(oneshot::Sender<std::result::Result<TrackingState, StoreError>>),
	History(oneshot::Sender<std::result::Result<Vec<Session>, StoreError>>),
	Flush(oneshot::Sender<()>),
}

/// Cloneable handle queuing operations for the [`PersistenceWorker`].
#[derive(Debug, Clone)]
pub struct PersistenceBridge {
	tx: mpsc::UnboundedSender<PersistOp>,
}

impl PersistenceBridge {
	/// Creates the bridge and the worker that must be spawned to drive it.
	pub fn new(store: Arc<dyn KeyValueStore>, config: PersistConfig) -> (Self, PersistenceWorker) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, PersistenceWorker::new(rx, store, config))
	}

	fn send(&self, op: PersistOp) -> Result<()> {
		self.tx.send(op).map_err(|_| TrailError::PersistenceClosed)
	}

	/// Queues a write-through of the full tracking projection.
	pub fn save(&self, state: TrackingState) -> Result<()> {
		self.send(PersistOp::SaveTracking(state))
	}

	/// Queues removal of the in-progress session. The user id is kept.
	pub fn clear_tracking(&self) -> Result<()> {
		self.send(PersistOp::ClearTracking)
	}

	/// Queues a read-modify-write appending one finalized session.
	pub fn append_history(&self, session: Session) -> Result<()> {
		self.send(PersistOp::AppendHistory(Box::new(session)))
	}

	/// Reads the tracking projection after all previously queued writes.
	pub async fn load(&self) -> Result<TrackingState> {
		let (tx, rx) = oneshot::channel();
		self.send(PersistOp::Load(tx))?;
		rx.await.map_err(|_| TrailError::PersistenceClosed)?.map_err(TrailError::from)
	}

	/// Reads the finalized session history after all previously queued writes.
	pub async fn history(&self) -> Result<Vec<Session>> {
		let (tx, rx) = oneshot::channel();
		self.send(PersistOp::History(tx))?;
		rx.await.map_err(|_| TrailError::PersistenceClosed)?.map_err(TrailError::from)
	}

	/// Resolves once every previously queued operation has been attempted.
	pub async fn flush(&self) -> Result<()> {
		let (tx, rx) = oneshot::channel();
		self.send(PersistOp::Flush(tx))?;
		rx.await.map_err(|_| TrailError::PersistenceClosed)
	}
}
