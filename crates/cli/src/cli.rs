use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "trail")]
#[command(about = "Record, inspect and export interaction sessions")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Toon)]
	pub format: OutputFormat,

	/// Configuration file (defaults to $TRAIL_CONFIG or ~/.config/trail/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Store file holding tracking state and history
	#[arg(long, global = true, value_name = "FILE")]
	pub store: Option<PathBuf>,

	/// Document location recorded on lifecycle actions
	#[arg(long, global = true, default_value = "about:blank")]
	pub url: String,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Begin a session (no-op when one is active)
	Start,

	/// Finalize the active session into history (no-op when idle)
	Stop,

	/// Show tracking state without modifying it
	Status,

	/// List finalized sessions
	History(HistoryArgs),

	/// Write finalized sessions as JSON documents
	Export(ExportArgs),

	/// Feed recorded raw events through capture against a page snapshot
	Replay(ReplayArgs),
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
	/// Only the most recent N sessions
	#[arg(short = 'n', long)]
	pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
	/// Export every finalized session (default: only the last one)
	#[arg(long, conflicts_with = "last")]
	pub all: bool,

	/// Export only the most recent session
	#[arg(long)]
	pub last: bool,

	/// Output directory
	#[arg(short, long, default_value = ".")]
	pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
	/// Page snapshot (JSON element tree rooted at `html`)
	#[arg(long, value_name = "FILE")]
	pub page: PathBuf,

	/// Newline-delimited JSON events
	#[arg(long, value_name = "FILE")]
	pub events: PathBuf,
}
