use anyhow::Context;
use tracing::info;
use trail::export_batch;
use trail::protocol::Session;

use super::Output;
use crate::cli::{ExportArgs, HistoryArgs};
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{Artifact, ArtifactType, ExportData, HistoryData, SessionSummary};

async fn load_history(ctx: &CommandContext) -> Result<Vec<Session>> {
	let (bridge, worker) = trail_runtime::spawn_persistence(ctx.store(), ctx.config.persist.clone());
	let history = bridge.history().await;
	drop(bridge);
	worker.await.context("persistence worker panicked")?;
	Ok(history?)
}

pub(super) async fn list(ctx: &CommandContext, args: HistoryArgs) -> Result<Output<HistoryData>> {
	let history = load_history(ctx).await?;
	let skip = args.limit.map_or(0, |limit| history.len().saturating_sub(limit));

	Ok(Output::new(HistoryData {
		total: history.len(),
		sessions: history[skip..].iter().map(SessionSummary::from).collect(),
	}))
}

pub(super) async fn export(ctx: &CommandContext, args: ExportArgs) -> Result<Output<ExportData>> {
	let history = load_history(ctx).await?;
	let selected = if args.all {
		&history[..]
	} else {
		&history[history.len().saturating_sub(1)..]
	};
	if selected.is_empty() {
		return Err(CliError::NothingToExport.into());
	}

	let files = export_batch(selected)?;
	tokio::fs::create_dir_all(&args.out)
		.await
		.with_context(|| format!("creating {}", args.out.display()))?;

	let mut output = Output::new(ExportData {
		out_dir: args.out.clone(),
		files: Vec::with_capacity(files.len()),
	});
	for file in files {
		let path = args.out.join(&file.file_name);
		tokio::fs::write(&path, &file.contents)
			.await
			.with_context(|| format!("writing {}", path.display()))?;
		output.data.files.push(path.clone());
		output = output.artifact(Artifact {
			artifact_type: ArtifactType::Session,
			path,
			size_bytes: Some(file.contents.len() as u64),
		});
	}

	info!(target = "trail.cli", files = output.data.files.len(), out = %args.out.display(), "sessions exported");
	Ok(output)
}
