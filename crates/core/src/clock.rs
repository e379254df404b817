//! Time sources for action timestamps and throttle windows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
	/// Milliseconds since the Unix epoch.
	fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_ms(&self) -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as u64)
			.unwrap_or_default()
	}
}

/// Clock that only moves when told to. Used by tests and the replayer.
#[derive(Debug, Default)]
pub struct ManualClock {
	now: AtomicU64,
}

impl ManualClock {
	pub fn new(start_ms: u64) -> Self {
		Self {
			now: AtomicU64::new(start_ms),
		}
	}

	pub fn set(&self, ms: u64) {
		self.now.store(ms, Ordering::SeqCst);
	}

	pub fn advance(&self, ms: u64) {
		self.now.fetch_add(ms, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> u64 {
		self.now.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn manual_clock_moves_on_request() {
		let clock = ManualClock::new(1_000);
		assert_eq!(clock.now_ms(), 1_000);
		clock.advance(250);
		assert_eq!(clock.now_ms(), 1_250);
		clock.set(10);
		assert_eq!(clock.now_ms(), 10);
	}

	#[test]
	fn system_clock_is_past_2020() {
		assert!(SystemClock.now_ms() > 1_577_836_800_000);
	}
}
