mod history;
mod replay;
mod tracking;

use serde::Serialize;
use tracing::error;

use crate::cli::{Cli, Commands};
use crate::context::CommandContext;
use crate::error::{Result, error_code};
use crate::output::{Artifact, Diagnostic, DiagnosticLevel, OutputFormat, ResultBuilder, print_result};

/// Payload plus side information produced by one command.
pub(crate) struct Output<T> {
	data: T,
	artifacts: Vec<Artifact>,
	diagnostics: Vec<Diagnostic>,
}

impl<T> Output<T> {
	fn new(data: T) -> Self {
		Self {
			data,
			artifacts: Vec::new(),
			diagnostics: Vec::new(),
		}
	}

	fn artifact(mut self, artifact: Artifact) -> Self {
		self.artifacts.push(artifact);
		self
	}

	fn diagnostic(mut self, level: DiagnosticLevel, message: impl Into<String>) -> Self {
		self.diagnostics.push(Diagnostic {
			level,
			message: message.into(),
			source: None,
		});
		self
	}
}

impl Commands {
	fn name(&self) -> &'static str {
		match self {
			Commands::Start => "start",
			Commands::Stop => "stop",
			Commands::Status => "status",
			Commands::History(_) => "history",
			Commands::Export(_) => "export",
			Commands::Replay(_) => "replay",
		}
	}
}

/// Runs the parsed command and prints its envelope. Returns whether it
/// succeeded.
pub async fn dispatch(cli: Cli) -> bool {
	let format = cli.format;
	let name = cli.command.name();

	let ctx = match CommandContext::from_cli(&cli) {
		Ok(ctx) => ctx,
		Err(err) => return report::<()>(name, format, Err(err)),
	};

	match cli.command {
		Commands::Start => report(name, format, tracking::start(&ctx).await),
		Commands::Stop => report(name, format, tracking::stop(&ctx).await),
		Commands::Status => report(name, format, tracking::status(&ctx).await),
		Commands::History(args) => report(name, format, history::list(&ctx, args).await),
		Commands::Export(args) => report(name, format, history::export(&ctx, args).await),
		Commands::Replay(args) => report(name, format, replay::run(&ctx, args).await),
	}
}

fn report<T: Serialize>(name: &str, format: OutputFormat, outcome: Result<Output<T>>) -> bool {
	match outcome {
		Ok(output) => {
			let result = ResultBuilder::new(name)
				.data(output.data)
				.artifacts(output.artifacts)
				.diagnostics(output.diagnostics)
				.build();
			print_result(&result, format);
			true
		}
		Err(err) => {
			error!(target = "trail.cli", command = name, error = %format!("{err:#}"), "command failed");
			let result = ResultBuilder::<()>::new(name).error(error_code(&err), format!("{err:#}")).build();
			print_result(&result, format);
			false
		}
	}
}
