//! Capture and persistence tuning loaded from `config.json`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrailError};

pub const DEFAULT_TEXT_LIMIT: usize = 100;
pub const DEFAULT_VALUE_LIMIT: usize = 200;
pub const DEFAULT_POINTER_THROTTLE_MS: u64 = 100;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrailConfig {
	pub capture: CaptureConfig,
	pub persist: PersistConfig,
}

impl TrailConfig {
	pub fn from_json(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json).map_err(|e| TrailError::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from `path`. A missing file yields defaults.
	pub fn load(path: &Path) -> Result<Self> {
		match fs::read_to_string(path) {
			Ok(content) => Self::from_json(&content),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(err) => Err(err.into()),
		}
	}

	fn validate(&self) -> Result<()> {
		if self.capture.pointer_throttle_ms == 0 {
			return Err(TrailError::Config("capture.pointerThrottleMs must be greater than zero".into()));
		}
		if self.persist.max_attempts == 0 {
			return Err(TrailError::Config("persist.maxAttempts must be at least 1".into()));
		}
		Ok(())
	}
}

/// Bounds applied while normalizing raw events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
	/// Maximum characters kept from visible text.
	pub text_limit: usize,
	/// Maximum characters kept from field values.
	pub value_limit: usize,
	/// Whether pointer movement is recorded at all.
	pub pointer_moves: bool,
	/// Leading-edge throttle window for pointer movement.
	pub pointer_throttle_ms: u64,
}

impl Default for CaptureConfig {
	fn default() -> Self {
		Self {
			text_limit: DEFAULT_TEXT_LIMIT,
			value_limit: DEFAULT_VALUE_LIMIT,
			pointer_moves: true,
			pointer_throttle_ms: DEFAULT_POINTER_THROTTLE_MS,
		}
	}
}

/// Retry policy for store writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistConfig {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
}

impl Default for PersistConfig {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			base_backoff_ms: 25,
			max_backoff_ms: 1_000,
		}
	}
}

impl PersistConfig {
	/// Delay before retry number `attempt` (1-based), doubling up to the cap.
	pub fn backoff(&self, attempt: u32) -> Duration {
		let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
		Duration::from_millis(self.base_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms))
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn empty_object_yields_defaults() {
		let config = TrailConfig::from_json("{}").unwrap();
		assert_eq!(config, TrailConfig::default());
		assert_eq!(config.capture.text_limit, 100);
		assert_eq!(config.capture.value_limit, 200);
	}

	#[test]
	fn partial_sections_keep_other_defaults() {
		let config = TrailConfig::from_json(r#"{"capture": {"pointerMoves": false}}"#).unwrap();
		assert!(!config.capture.pointer_moves);
		assert_eq!(config.capture.pointer_throttle_ms, DEFAULT_POINTER_THROTTLE_MS);
		assert_eq!(config.persist, PersistConfig::default());
	}

	#[test]
	fn zero_throttle_window_is_rejected() {
		let err = TrailConfig::from_json(r#"{"capture": {"pointerThrottleMs": 0}}"#).unwrap_err();
		assert!(matches!(err, TrailError::Config(_)));
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = PersistConfig {
			max_attempts: 10,
			base_backoff_ms: 10,
			max_backoff_ms: 50,
		};
		assert_eq!(policy.backoff(1), Duration::from_millis(10));
		assert_eq!(policy.backoff(2), Duration::from_millis(20));
		assert_eq!(policy.backoff(3), Duration::from_millis(40));
		assert_eq!(policy.backoff(4), Duration::from_millis(50));
		assert_eq!(policy.backoff(80), Duration::from_millis(50));
	}

	#[test]
	fn missing_file_loads_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let config = TrailConfig::load(&dir.path().join("absent.json")).unwrap();
		assert_eq!(config, TrailConfig::default());
	}

	#[test]
	fn load_reads_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		let mut file = fs::File::create(&path).unwrap();
		write!(file, r#"{{"persist": {{"maxAttempts": 2}}}}"#).unwrap();
		let config = TrailConfig::load(&path).unwrap();
		assert_eq!(config.persist.max_attempts, 2);
	}
}
