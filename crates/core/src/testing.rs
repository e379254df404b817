//! In-memory test doubles for the host capabilities.
//!
//! [`RecordingHost`] stands in for the page: it hands out listener and
//! interceptor handles and records what is currently installed so tests can
//! assert that start/stop cycles leave nothing behind. [`FlakyStore`] wraps
//! a store and fails a configurable number of writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::capture::{EventHost, HookId, ListenerId, ListenerKind};
use crate::persist::{KeyValueStore, StoreError};

/// Fake page surface.
#[derive(Debug)]
pub struct RecordingHost {
	location: String,
	next_id: u64,
	listeners: Vec<(ListenerId, ListenerKind)>,
	hooks: Vec<HookId>,
	registrations: usize,
}

impl RecordingHost {
	pub fn new(location: impl Into<String>) -> Self {
		Self {
			location: location.into(),
			next_id: 0,
			listeners: Vec::new(),
			hooks: Vec::new(),
			registrations: 0,
		}
	}

	pub fn set_location(&mut self, location: impl Into<String>) {
		self.location = location.into();
	}

	/// Listeners currently installed.
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	pub fn has_listener(&self, kind: ListenerKind) -> bool {
		self.listeners.iter().any(|(_, k)| *k == kind)
	}

	/// Interceptor layers currently wrapping the navigation primitive.
	pub fn hook_depth(&self) -> usize {
		self.hooks.len()
	}

	/// Listener registrations over the host's lifetime.
	pub fn total_registrations(&self) -> usize {
		self.registrations
	}

	fn next(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}
}

impl EventHost for RecordingHost {
	fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
		let id = ListenerId(self.next());
		self.listeners.push((id, kind));
		self.registrations += 1;
		id
	}

	fn remove_listener(&mut self, id: ListenerId) {
		self.listeners.retain(|(registered, _)| *registered != id);
	}

	fn intercept_navigation(&mut self) -> HookId {
		let hook = HookId(self.next());
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

/// Store wrapper whose next `failures` writes fail. Reads fail separately,
/// see [`fail_reads`](Self::fail_reads).
#[derive(Debug)]
pub struct FlakyStore<S> {
	inner: S,
	failures: AtomicUsize,
	writes: AtomicUsize,
	read_failures: AtomicUsize,
	reads: AtomicUsize,
}

impl<S> FlakyStore<S> {
	pub fn new(inner: S, failures: usize) -> Arc<Self> {
		Arc::new(Self {
			inner,
			failures: AtomicUsize::new(failures),
			writes: AtomicUsize::new(0),
			read_failures: AtomicUsize::new(0),
			reads: AtomicUsize::new(0),
		})
	}

	pub fn inner(&self) -> &S {
		&self.inner
	}

	pub fn fail_next(&self, failures: usize) {
		self.failures.store(failures, Ordering::SeqCst);
	}

	/// Makes the next `failures` reads fail with [`StoreError::Unavailable`].
	pub fn fail_reads(&self, failures: usize) {
		self.read_failures.store(failures, Ordering::SeqCst);
	}

	/// Write attempts seen, failed ones included.
	pub fn write_attempts(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}

	pub fn read_attempts(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}

	fn check(&self) -> Result<(), StoreError> {
		consume(&self.writes, &self.failures)
	}
}

fn consume(attempts: &AtomicUsize, failures: &AtomicUsize) -> Result<(), StoreError> {
	attempts.fetch_add(1, Ordering::SeqCst);
	let failed = failures
		.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
		.is_ok();
	if failed {
		return Err(StoreError::Unavailable("injected failure".into()));
	}
	Ok(())
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for FlakyStore<S> {
	async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
		consume(&self.reads, &self.read_failures)?;
		self.inner.get(keys).await
	}

	async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
		self.check()?;
		self.inner.set(entries).await
	}

	async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
		self.check()?;
		self.inner.remove(keys).await
	}
}
