//! JSON file backed [`KeyValueStore`].
//!
//! The whole store is one JSON object on disk. Every write reads the current
//! object, applies the change and replaces the file through a temporary
//! sibling and a rename, so a crash mid-write leaves the previous contents.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::trace;
use trail::{KeyValueStore, StoreError};

#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
	/// Serializes read-modify-write cycles within this process.
	lock: Mutex<()>,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn read(&self) -> Result<Map<String, Value>, StoreError> {
		let content = match fs::read_to_string(&self.path).await {
			Ok(content) => content,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
			Err(err) => return Err(err.into()),
		};
		if content.trim().is_empty() {
			return Ok(Map::new());
		}
		match serde_json::from_str(&content)? {
			Value::Object(entries) => Ok(entries),
			other => Err(StoreError::Malformed {
				key: self.path.display().to_string(),
				message: format!("expected a JSON object, found {}", json_kind(&other)),
			}),
		}
	}

	async fn write(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).await?;
		}
		let json = serde_json::to_string_pretty(entries)?;
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, json).await?;
		fs::rename(&tmp, &self.path).await?;
		trace!(target = "trail.store", path = %self.path.display(), keys = entries.len(), "store file written");
		Ok(())
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

#[async_trait]
impl KeyValueStore for FileStore {
	async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
		let _guard = self.lock.lock().await;
		let mut entries = self.read().await?;
		Ok(keys
			.iter()
			.filter_map(|key| entries.remove(*key).map(|value| (key.to_string(), value)))
			.collect())
	}

	async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
		let _guard = self.lock.lock().await;
		let mut current = self.read().await?;
		current.extend(entries);
		self.write(&current).await
	}

	async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
		let _guard = self.lock.lock().await;
		let mut current = self.read().await?;
		let before = current.len();
		for key in keys {
			current.remove(*key);
		}
		if current.len() == before {
			return Ok(());
		}
		self.write(&current).await
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use tempfile::TempDir;

	use super::*;

	fn entries(pairs: &[(&str, Value)]) -> Map<String, Value> {
		pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
	}

	#[tokio::test]
	async fn missing_file_reads_empty() {
		let tmp = TempDir::new().unwrap();
		let store = FileStore::new(tmp.path().join("store.json"));
		assert!(store.get(&["isTracking"]).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn set_merges_and_persists() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("nested/store.json");
		let store = FileStore::new(&path);

		store.set(entries(&[("userId", json!("u1"))])).await.unwrap();
		store.set(entries(&[("isTracking", json!(true))])).await.unwrap();

		let reopened = FileStore::new(&path);
		let got = reopened.get(&["userId", "isTracking", "absent"]).await.unwrap();
		assert_eq!(got.get("userId"), Some(&json!("u1")));
		assert_eq!(got.get("isTracking"), Some(&json!(true)));
		assert!(!got.contains_key("absent"));
		assert!(!path.with_extension("json.tmp").exists());
	}

	#[tokio::test]
	async fn remove_drops_only_named_keys() {
		let tmp = TempDir::new().unwrap();
		let store = FileStore::new(tmp.path().join("store.json"));
		store
			.set(entries(&[("userId", json!("u1")), ("sessionData", json!([]))]))
			.await
			.unwrap();

		store.remove(&["sessionData"]).await.unwrap();

		let got = store.get(&["userId", "sessionData"]).await.unwrap();
		assert_eq!(got.len(), 1);
		assert!(got.contains_key("userId"));
	}

	#[tokio::test]
	async fn non_object_file_is_malformed() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("store.json");
		std::fs::write(&path, "[1, 2]").unwrap();
		let store = FileStore::new(&path);

		let err = store.get(&["userId"]).await.unwrap_err();
		assert!(matches!(err, StoreError::Malformed { .. }), "{err}");
	}
}
