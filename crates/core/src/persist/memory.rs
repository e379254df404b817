use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{KeyValueStore, StoreError};

/// Process-local store. Cloning is not supported; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<Map<String, Value>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_entries(entries: Map<String, Value>) -> Self {
		Self {
			entries: Mutex::new(entries),
		}
	}

	/// Copy of every entry currently stored.
	pub fn snapshot(&self) -> Map<String, Value> {
		self.entries.lock().clone()
	}

	pub fn value(&self, key: &str) -> Option<Value> {
		self.entries.lock().get(key).cloned()
	}
}

#[async_trait]
impl KeyValueStore for MemoryStore {
	async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
		let entries = self.entries.lock();
		Ok(keys
			.iter()
			.filter_map(|key| entries.get(*key).map(|value| (key.to_string(), value.clone())))
			.collect())
	}

	async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
		self.entries.lock().extend(entries);
		Ok(())
	}

	async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
		let mut entries = self.entries.lock();
		for key in keys {
			entries.remove(*key);
		}
		Ok(())
	}
}
