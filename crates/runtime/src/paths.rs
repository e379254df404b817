//! Default locations for configuration and the store file.

use std::ffi::OsString;
use std::path::PathBuf;

/// Overrides the configuration file location.
pub const CONFIG_ENV: &str = "TRAIL_CONFIG";

/// `$TRAIL_CONFIG`, else `$XDG_CONFIG_HOME/trail/config.json`, else
/// `~/.config/trail/config.json`.
pub fn config_path() -> PathBuf {
	config_path_from(
		std::env::var_os(CONFIG_ENV),
		std::env::var_os("XDG_CONFIG_HOME"),
		std::env::var_os("HOME"),
	)
}

fn config_path_from(explicit: Option<OsString>, xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
	if let Some(path) = explicit.filter(|p| !p.is_empty()) {
		return PathBuf::from(path);
	}
	config_home(xdg, home).join("trail/config.json")
}

fn config_home(xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
	xdg.filter(|p| !p.is_empty())
		.map(PathBuf::from)
		.or_else(|| home.map(|h| PathBuf::from(h).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."))
}

/// Platform data directory (`$XDG_DATA_HOME`, `~/Library/Application Support`,
/// `%APPDATA%`) joined with `trail/store.json`.
pub fn default_store_path() -> PathBuf {
	dirs::data_dir()
		.unwrap_or_else(|| config_home(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME")))
		.join("trail/store.json")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_path_wins() {
		let path = config_path_from(Some("/etc/trail.json".into()), Some("/xdg".into()), Some("/home/u".into()));
		assert_eq!(path, PathBuf::from("/etc/trail.json"));
	}

	#[test]
	fn xdg_config_home_is_preferred_over_home() {
		let path = config_path_from(None, Some("/xdg".into()), Some("/home/u".into()));
		assert_eq!(path, PathBuf::from("/xdg/trail/config.json"));
	}

	#[test]
	fn falls_back_to_dot_config() {
		let path = config_path_from(Some("".into()), None, Some("/home/u".into()));
		assert_eq!(path, PathBuf::from("/home/u/.config/trail/config.json"));
	}

	#[test]
	fn store_path_ends_with_trail_store() {
		assert!(default_store_path().ends_with("trail/store.json"));
	}
}
