//! Page surface for command-line invocations.
//!
//! Every invocation behaves like one page load: the controller is restored
//! from the store, handles the command, and is torn down after the
//! persistence worker has drained.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::trace;
use trail::{Clock, EventHost, HookId, ListenerId, ListenerKind, RestoreOutcome, SessionController};

use crate::context::CommandContext;
use crate::error::Result;

/// Tracks registrations and the current location. Events are fed in by the
/// caller rather than delivered by a browser.
#[derive(Debug)]
pub struct CliHost {
	location: String,
	next_id: u64,
	listeners: Vec<(ListenerId, ListenerKind)>,
	hooks: Vec<HookId>,
}

impl CliHost {
	pub fn new(location: impl Into<String>) -> Self {
		Self {
			location: location.into(),
			next_id: 0,
			listeners: Vec::new(),
			hooks: Vec::new(),
		}
	}

	pub fn navigate(&mut self, location: impl Into<String>) {
		self.location = location.into();
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	pub fn intercepted(&self) -> bool {
		!self.hooks.is_empty()
	}

	fn issue(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}
}

impl EventHost for CliHost {
	fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
		let id = ListenerId(self.issue());
		trace!(target = "trail.host", ?kind, id = id.0, "listener added");
		self.listeners.push((id, kind));
		id
	}

	fn remove_listener(&mut self, id: ListenerId) {
		trace!(target = "trail.host", id = id.0, "listener removed");
		self.listeners.retain(|(registered, _)| *registered != id);
	}

	fn intercept_navigation(&mut self) -> HookId {
		let hook = HookId(self.issue());
		self.hooks.push(hook);
		hook
	}

	fn restore_navigation(&mut self, hook: HookId) {
		self.hooks.retain(|installed| *installed != hook);
	}

	fn location(&self) -> String {
		self.location.clone()
	}
}

/// A restored controller plus the worker writing its state.
pub struct Page {
	pub controller: SessionController<CliHost>,
	pub restore: RestoreOutcome,
	worker: JoinHandle<()>,
}

impl Page {
	pub async fn open(ctx: &CommandContext, clock: Arc<dyn Clock>) -> Result<Self> {
		let (bridge, worker) = trail_runtime::spawn_persistence(ctx.store(), ctx.config.persist.clone());
		let mut controller = SessionController::new(CliHost::new(&ctx.url), bridge, clock, ctx.config.capture.clone());
		let restore = controller.restore().await.context("restoring tracking state")?;
		Ok(Self {
			controller,
			restore,
			worker,
		})
	}

	/// Drops the controller and waits until every queued write was attempted.
	pub async fn close(self) -> Result<()> {
		let Page { controller, worker, .. } = self;
		controller.bridge().flush().await?;
		drop(controller);
		worker.await.context("persistence worker panicked")?;
		Ok(())
	}
}
