//! Drives a page snapshot with recorded raw events.
//!
//! Each line of the events file is one JSON object. Element events name
//! their target by locator:
//!
//! ```text
//! {"type": "start"}
//! {"type": "click", "target": "/html/body/nav[1]/a[2]", "at": 1700000000100}
//! {"type": "navigate", "url": "https://example.com/blog", "trigger": "push_state"}
//! {"type": "pointer_move", "x": 10, "y": 20}
//! {"type": "stop"}
//! ```
//!
//! `at` pins the clock (ms since epoch); without it the clock stays put.

use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;
use trail::dom::Document;
use trail::protocol::NavigationTrigger;
use trail::{Clock, ManualClock, RawEvent, SystemClock};

use super::Output;
use crate::cli::ReplayArgs;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::host::Page;
use crate::output::{DiagnosticLevel, ReplayData, SessionSummary};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayEvent {
	Start,
	Stop,
	Click { target: String },
	Submit { target: String },
	Input { target: String },
	Navigate {
		url: String,
		#[serde(default)]
		trigger: Option<NavigationTrigger>,
	},
	PointerMove { x: f64, y: f64 },
}

#[derive(Debug, Deserialize)]
struct ReplayLine {
	#[serde(default)]
	at: Option<u64>,
	#[serde(flatten)]
	event: ReplayEvent,
}

pub(super) async fn run(ctx: &CommandContext, args: ReplayArgs) -> Result<Output<ReplayData>> {
	let page_json = tokio::fs::read_to_string(&args.page)
		.await
		.with_context(|| format!("reading {}", args.page.display()))?;
	let doc = Document::from_json(&page_json)
		.map_err(|err| CliError::InvalidInput(format!("page snapshot {}: {err}", args.page.display())))?;
	let events = tokio::fs::read_to_string(&args.events)
		.await
		.with_context(|| format!("reading {}", args.events.display()))?;

	let clock = Arc::new(ManualClock::new(SystemClock.now_ms()));
	let mut page = Page::open(ctx, clock.clone()).await?;
	let source = args.events.display().to_string();
	let fed = feed(&mut page, &doc, &clock, &events, &source);
	page.close().await?;
	fed
}

fn feed(page: &mut Page, doc: &Document, clock: &ManualClock, events: &str, source: &str) -> Result<Output<ReplayData>> {
	let mut data = ReplayData {
		events: 0,
		captured: 0,
		skipped: 0,
		tracking: false,
		user_id: None,
		finalized: Vec::new(),
	};
	let mut warnings = Vec::new();
	let controller = &mut page.controller;

	for (index, line) in events.lines().enumerate() {
		let line_no = index + 1;
		if line.trim().is_empty() {
			continue;
		}
		let ReplayLine { at, event } = serde_json::from_str(line).map_err(|err| CliError::ReplayLine {
			path: source.to_string(),
			line: line_no,
			message: err.to_string(),
		})?;
		data.events += 1;
		if let Some(at) = at {
			clock.set(at);
		}

		let raw = match event {
			ReplayEvent::Start => {
				controller.start()?;
				continue;
			}
			ReplayEvent::Stop => {
				if let Some(session) = controller.stop()? {
					data.finalized.push(SessionSummary::from(&session));
				}
				continue;
			}
			ReplayEvent::Click { target } => doc.resolve(&target).map(|target| RawEvent::Click { target }).ok_or(target),
			ReplayEvent::Submit { target } => doc.resolve(&target).map(|form| RawEvent::Submit { form }).ok_or(target),
			ReplayEvent::Input { target } => doc.resolve(&target).map(|target| RawEvent::Input { target }).ok_or(target),
			ReplayEvent::Navigate { url, trigger } => {
				controller.host_mut().navigate(url.clone());
				Ok(RawEvent::Navigation {
					trigger: trigger.unwrap_or(NavigationTrigger::PushState),
					url,
				})
			}
			ReplayEvent::PointerMove { x, y } => Ok(RawEvent::PointerMove { x, y }),
		};
		let event = match raw {
			Ok(event) => event,
			Err(locator) => {
				warnings.push(format!("line {line_no}: no element at {locator}"));
				data.skipped += 1;
				continue;
			}
		};
		if controller.dispatch(event)?.is_some() {
			data.captured += 1;
		}
	}

	data.tracking = controller.is_tracking();
	data.user_id = controller.user_id().map(str::to_string);
	debug!(
		target = "trail.cli",
		events = data.events,
		captured = data.captured,
		skipped = data.skipped,
		"replay finished"
	);

	let mut output = Output::new(data);
	for warning in warnings {
		output = output.diagnostic(DiagnosticLevel::Warning, warning);
	}
	Ok(output)
}
