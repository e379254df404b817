use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;
use trail::{KeyValueStore, TrailConfig};
use trail_runtime::{FileStore, paths};

use crate::cli::Cli;
use crate::error::Result;

/// Resolved settings shared by every command of one invocation.
#[derive(Debug)]
pub struct CommandContext {
	pub config: TrailConfig,
	pub store_path: PathBuf,
	pub url: String,
}

impl CommandContext {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let config_path = cli.config.clone().unwrap_or_else(paths::config_path);
		let config = TrailConfig::load(&config_path)
			.with_context(|| format!("loading configuration from {}", config_path.display()))?;
		let store_path = cli.store.clone().unwrap_or_else(paths::default_store_path);

		debug!(
			target = "trail.cli",
			config = %config_path.display(),
			store = %store_path.display(),
			"context resolved"
		);
		Ok(Self {
			config,
			store_path,
			url: cli.url.clone(),
		})
	}

	pub fn store(&self) -> Arc<dyn KeyValueStore> {
		Arc::new(FileStore::new(&self.store_path))
	}
}
