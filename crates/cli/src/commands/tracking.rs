use std::sync::Arc;

use anyhow::Context;
use trail::protocol::{CommandRequest, CommandResponse};
use trail::{RestoreOutcome, SystemClock};

use super::Output;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::host::Page;
use crate::output::{DiagnosticLevel, StatusData};

pub(super) async fn start(ctx: &CommandContext) -> Result<Output<CommandResponse>> {
	send(ctx, CommandRequest::StartTracking).await
}

pub(super) async fn stop(ctx: &CommandContext) -> Result<Output<CommandResponse>> {
	send(ctx, CommandRequest::StopTracking).await
}

async fn send(ctx: &CommandContext, request: CommandRequest) -> Result<Output<CommandResponse>> {
	let mut page = Page::open(ctx, Arc::new(SystemClock)).await?;
	let restore = page.restore;
	let response = page.controller.handle_command(request).await;
	page.close().await?;

	if response.is_error() {
		return Err(CliError::CommandFailed(response.status).into());
	}

	let output = Output::new(response);
	Ok(match restore {
		RestoreOutcome::Resumed { actions } => {
			output.diagnostic(DiagnosticLevel::Info, format!("resumed interrupted session with {actions} actions"))
		}
		RestoreOutcome::Discarded => output.diagnostic(DiagnosticLevel::Warning, "discarded unreadable tracking state"),
		RestoreOutcome::Idle | RestoreOutcome::AlreadyRestored => output,
	})
}

/// Reads the persisted projection without restoring, so nothing is appended.
pub(super) async fn status(ctx: &CommandContext) -> Result<Output<StatusData>> {
	let (bridge, worker) = trail_runtime::spawn_persistence(ctx.store(), ctx.config.persist.clone());
	let state = bridge.load().await;
	let history = bridge.history().await;
	drop(bridge);
	worker.await.context("persistence worker panicked")?;

	let state = state?;
	Ok(Output::new(StatusData {
		tracking: state.is_tracking,
		user_id: state.user_id,
		session_start: state.session_start,
		actions: state.actions.len(),
		history_length: history?.len(),
	}))
}
