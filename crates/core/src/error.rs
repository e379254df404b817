use thiserror::Error;

use crate::persist::StoreError;

pub type Result<T> = std::result::Result<T, TrailError>;

#[derive(Debug, Error)]
pub enum TrailError {
	#[error("Store error: {0}")]
	Store(#[from] StoreError),

	#[error("Persistence worker is no longer running")]
	PersistenceClosed,

	#[error("Session state has not been restored for this page load")]
	NotRestored,

	#[error("Export error: {0}")]
	Export(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
