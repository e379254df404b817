use std::error::Error as StdError;

use thiserror::Error;
use trail::{StoreError, TrailError};

use crate::output::ErrorCode;

/// Failures originating in the command-line layer itself.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("{path} line {line}: {message}")]
	ReplayLine { path: String, line: usize, message: String },

	#[error("No finalized sessions to export")]
	NothingToExport,

	#[error("Command failed: {0}")]
	CommandFailed(String),
}

pub type Result<T> = anyhow::Result<T>;

/// Maps the first recognizable error in the chain to an [`ErrorCode`].
pub fn error_code(err: &anyhow::Error) -> ErrorCode {
	err.chain().find_map(classify).unwrap_or(ErrorCode::InternalError)
}

fn classify(err: &(dyn StdError + 'static)) -> Option<ErrorCode> {
	if let Some(err) = err.downcast_ref::<CliError>() {
		return Some(match err {
			CliError::InvalidInput(_) | CliError::ReplayLine { .. } => ErrorCode::InvalidInput,
			CliError::NothingToExport => ErrorCode::ExportFailed,
			CliError::CommandFailed(_) => ErrorCode::StoreError,
		});
	}
	if let Some(err) = err.downcast_ref::<TrailError>() {
		return Some(match err {
			TrailError::Config(_) => ErrorCode::ConfigError,
			TrailError::Export(_) => ErrorCode::ExportFailed,
			TrailError::Store(_) | TrailError::PersistenceClosed => ErrorCode::StoreError,
			TrailError::Io(_) => ErrorCode::IoError,
			TrailError::Serialization(_) => ErrorCode::InvalidInput,
			TrailError::NotRestored => ErrorCode::InternalError,
		});
	}
	if err.downcast_ref::<StoreError>().is_some() {
		return Some(ErrorCode::StoreError);
	}
	if err.downcast_ref::<std::io::Error>().is_some() {
		return Some(ErrorCode::IoError);
	}
	if err.downcast_ref::<serde_json::Error>().is_some() {
		return Some(ErrorCode::InvalidInput);
	}
	None
}

#[cfg(test)]
mod tests {
	use anyhow::Context;

	use super::*;

	#[test]
	fn context_does_not_hide_trail_errors() {
		let err = Err::<(), _>(TrailError::Config("bad".into()))
			.context("loading configuration")
			.unwrap_err();
		assert_eq!(error_code(&err), ErrorCode::ConfigError);
	}

	#[test]
	fn io_errors_map_to_io_code() {
		let err = anyhow::Error::new(std::io::Error::other("disk"));
		assert_eq!(error_code(&err), ErrorCode::IoError);
	}

	#[test]
	fn unknown_errors_are_internal() {
		assert_eq!(error_code(&anyhow::anyhow!("boom")), ErrorCode::InternalError);
	}
}
