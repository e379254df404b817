//! Runtime glue for trail hosts: on-disk store, default paths, and the
//! persistence worker task.

pub mod file_store;
pub mod paths;

use std::sync::Arc;

use tokio::task::JoinHandle;
use trail::{KeyValueStore, PersistConfig, PersistenceBridge};

pub use file_store::FileStore;

/// Starts the persistence worker for `store` on the current runtime.
///
/// The worker finishes once every clone of the returned bridge is dropped;
/// awaiting the handle afterwards guarantees all queued writes were attempted.
pub fn spawn_persistence(store: Arc<dyn KeyValueStore>, config: PersistConfig) -> (PersistenceBridge, JoinHandle<()>) {
	let (bridge, worker) = PersistenceBridge::new(store, config);
	let handle = tokio::spawn(worker.run());
	(bridge, handle)
}
