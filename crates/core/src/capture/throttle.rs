//! Fixed-window, leading-edge rate limiting for high-frequency events.

/// Admits the first call of each window and drops the rest.
///
/// A window opens at the admitted call and lasts `window_ms`. There is no
/// trailing call: whatever arrives inside an open window is lost.
#[derive(Debug, Clone)]
pub struct Throttle {
	window_ms: u64,
	opened_at: Option<u64>,
}

impl Throttle {
	pub fn new(window_ms: u64) -> Self {
		Self {
			window_ms,
			opened_at: None,
		}
	}

	pub fn window_ms(&self) -> u64 {
		self.window_ms
	}

	/// Returns true when a call at `now_ms` should run.
	pub fn admit(&mut self, now_ms: u64) -> bool {
		if let Some(opened) = self.opened_at {
			// A clock stepping backwards reopens the window instead of stalling it.
			if now_ms >= opened && now_ms - opened < self.window_ms {
				return false;
			}
		}
		self.opened_at = Some(now_ms);
		true
	}

	pub fn reset(&mut self) {
		self.opened_at = None;
	}
}
