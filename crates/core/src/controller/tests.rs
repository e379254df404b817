use serde_json::{Map, json};
use trail_protocol::{ClickTarget, STATUS_ALREADY_TRACKING, STATUS_NOT_TRACKING, STATUS_TRACKING_STARTED, STATUS_TRACKING_STOPPED, keys};

use super::*;
use crate::clock::ManualClock;
use crate::config::PersistConfig;
use crate::dom::{Document, NodeSpec};
use crate::persist::{KeyValueStore, MemoryStore, StoreError};
use crate::testing::{FlakyStore, RecordingHost};

const URL: &str = "https://example.com/start";

fn page() -> Document {
	Document::from_spec(
		NodeSpec::new("html").child(
			NodeSpec::new("body")
				.child(NodeSpec::new("p").text("hello"))
				.child(
					NodeSpec::new("a")
						.attr("href", "/next")
						.child(NodeSpec::new("span").attr("role", "button").text("Go")),
				),
		),
	)
}

struct Harness {
	controller: SessionController<RecordingHost>,
	clock: Arc<ManualClock>,
	store: Arc<MemoryStore>,
}

fn harness_with(store: Arc<MemoryStore>) -> Harness {
	let clock = Arc::new(ManualClock::new(10_000));
	let (bridge, worker) = PersistenceBridge::new(store.clone(), PersistConfig::default());
	tokio::spawn(worker.run());
	let controller = SessionController::new(RecordingHost::new(URL), bridge, clock.clone(), CaptureConfig::default());
	Harness { controller, clock, store }
}

async fn restored() -> Harness {
	let mut harness = harness_with(Arc::new(MemoryStore::new()));
	assert_eq!(harness.controller.restore().await.unwrap(), RestoreOutcome::Idle);
	harness
}

fn click(timestamp: u64, xpath: &str) -> Action {
	Action::new(
		timestamp,
		URL,
		ActionKind::Click(ClickTarget {
			tag: "p".into(),
			xpath: xpath.into(),
			..ClickTarget::default()
		}),
	)
}

fn interrupted_entries(start: u64, actions: &[Action]) -> Map<String, serde_json::Value> {
	let mut entries = Map::new();
	entries.insert(keys::IS_TRACKING.into(), json!(true));
	entries.insert(keys::USER_ID.into(), json!("user-7"));
	entries.insert(keys::SESSION_START.into(), json!(start));
	entries.insert(keys::SESSION_DATA.into(), serde_json::to_value(actions).unwrap());
	entries
}

fn interrupted_store(start: u64, actions: &[Action]) -> Arc<MemoryStore> {
	Arc::new(MemoryStore::with_entries(interrupted_entries(start, actions)))
}

fn fast_retry() -> PersistConfig {
	PersistConfig {
		max_attempts: 3,
		base_backoff_ms: 1,
		max_backoff_ms: 4,
	}
}

/// Controller over a store whose reads can be made to fail.
fn flaky_controller(store: &Arc<FlakyStore<MemoryStore>>) -> SessionController<RecordingHost> {
	let (bridge, worker) = PersistenceBridge::new(store.clone(), fast_retry());
	tokio::spawn(worker.run());
	SessionController::new(
		RecordingHost::new(URL),
		bridge,
		Arc::new(ManualClock::new(10_000)),
		CaptureConfig::default(),
	)
}

fn type_names(session: &Session) -> Vec<&'static str> {
	session.actions.iter().map(Action::type_name).collect()
}

#[tokio::test]
async fn session_holds_only_events_between_start_and_stop() {
	let doc = page();
	let paragraph = doc.resolve("/html/body/p[1]").unwrap();
	let mut h = restored().await;

	assert!(h.controller.dispatch(RawEvent::Click { target: paragraph }).unwrap().is_none());

	assert!(h.controller.start().unwrap());
	for _ in 0..3 {
		h.clock.advance(5);
		assert!(h.controller.dispatch(RawEvent::Click { target: paragraph }).unwrap().is_some());
	}
	let session = h.controller.stop().unwrap().unwrap();

	assert!(h.controller.dispatch(RawEvent::Click { target: paragraph }).unwrap().is_none());
	assert_eq!(type_names(&session), vec!["session_started", "click", "click", "click", "session_stopped"]);
	assert_eq!(session.session_start, 10_000);
	assert_eq!(session.session_end, Some(10_015));

	let history = h.controller.bridge().history().await.unwrap();
	assert_eq!(history, vec![session]);
}

#[tokio::test]
async fn second_start_keeps_identity() {
	let mut h = restored().await;

	assert!(h.controller.start().unwrap());
	let first = h.controller.state().active().cloned().unwrap();
	h.clock.advance(1_000);
	assert!(!h.controller.start().unwrap());
	let second = h.controller.state().active().unwrap();

	assert_eq!(second.user_id(), first.user_id());
	assert_eq!(second.session_start(), first.session_start());
	assert_eq!(second.actions().len(), 1);
}

#[tokio::test]
async fn restore_adopts_interrupted_session() {
	let persisted = [click(2_000, "/html/body/p[1]"), click(2_500, "/html/body/p[1]")];
	let mut h = harness_with(interrupted_store(1_500, &persisted));

	assert_eq!(h.controller.restore().await.unwrap(), RestoreOutcome::Resumed { actions: 2 });
	assert_eq!(h.controller.user_id(), Some("user-7"));
	assert_eq!(h.controller.host().hook_depth(), 1);

	let session = h.controller.stop().unwrap().unwrap();
	assert_eq!(session.user_id, "user-7");
	assert_eq!(session.session_start, 1_500);
	assert_eq!(session.actions[..2], persisted);
	assert_eq!(&type_names(&session)[2..], &["session_restored", "session_stopped"]);
}

#[tokio::test]
async fn restore_runs_once() {
	let mut h = restored().await;
	assert_eq!(h.controller.restore().await.unwrap(), RestoreOutcome::AlreadyRestored);
}

#[tokio::test]
async fn direct_stop_before_restore_is_refused() {
	let mut h = harness_with(interrupted_store(1_500, &[click(2_000, "/html/body/p[1]")]));
	assert!(matches!(h.controller.stop(), Err(TrailError::NotRestored)));
	assert!(matches!(h.controller.start(), Err(TrailError::NotRestored)));
}

#[tokio::test]
async fn stop_command_waits_for_restore() {
	let persisted = [click(2_000, "/html/body/p[1]")];
	let mut h = harness_with(interrupted_store(1_500, &persisted));

	let response = h.controller.handle_command(CommandRequest::StopTracking).await;
	assert_eq!(response.status, STATUS_TRACKING_STOPPED);

	let history = h.controller.bridge().history().await.unwrap();
	assert_eq!(history.len(), 1);
	assert_eq!(history[0].session_start, 1_500);
	assert_eq!(history[0].actions[0], persisted[0]);
}

#[tokio::test]
async fn commands_are_answered_when_no_op() {
	let mut h = harness_with(Arc::new(MemoryStore::new()));

	let started = h.controller.handle_command(CommandRequest::StartTracking).await;
	assert_eq!(started.status, STATUS_TRACKING_STARTED);
	let user_id = started.user_id.clone().unwrap();

	let again = h.controller.handle_command(CommandRequest::StartTracking).await;
	assert_eq!(again.status, STATUS_ALREADY_TRACKING);
	assert_eq!(again.user_id.as_deref(), Some(user_id.as_str()));

	let stopped = h.controller.handle_command(CommandRequest::StopTracking).await;
	assert_eq!(stopped.status, STATUS_TRACKING_STOPPED);
	let idle = h.controller.handle_command(CommandRequest::StopTracking).await;
	assert_eq!(idle.status, STATUS_NOT_TRACKING);
}

#[tokio::test]
async fn anchor_button_is_button_click() {
	let doc = page();
	let span = doc.resolve("/html/body/a[1]/span[1]").unwrap();
	let mut h = restored().await;
	h.controller.start().unwrap();

	let action = h.controller.dispatch(RawEvent::Click { target: span }).unwrap().unwrap();
	assert_eq!(action.type_name(), "button_click");
}

#[tokio::test]
async fn cycles_leave_no_listeners_behind() {
	let mut h = restored().await;
	for _ in 0..5 {
		h.controller.start().unwrap();
		assert_eq!(h.controller.host().hook_depth(), 1);
		h.controller.stop().unwrap();
	}
	assert_eq!(h.controller.host().hook_depth(), 0);
	assert_eq!(h.controller.host().listener_count(), 0);
}

#[tokio::test]
async fn timestamps_never_decrease() {
	let doc = page();
	let paragraph = doc.resolve("/html/body/p[1]").unwrap();
	let mut h = restored().await;
	h.controller.start().unwrap();

	h.clock.set(9_000);
	h.controller.dispatch(RawEvent::Click { target: paragraph }).unwrap();
	let session = h.controller.stop().unwrap().unwrap();

	let stamps: Vec<_> = session.actions.iter().map(|a| a.timestamp).collect();
	assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "{stamps:?}");
	assert_eq!(session.session_end, Some(10_000));
}

#[tokio::test]
async fn user_id_survives_between_sessions() {
	let mut h = restored().await;

	h.controller.start().unwrap();
	let first = h.controller.stop().unwrap().unwrap();
	h.controller.start().unwrap();
	let second = h.controller.stop().unwrap().unwrap();
	h.controller.bridge().flush().await.unwrap();

	assert_eq!(first.user_id, second.user_id);
	assert_eq!(h.store.value(keys::USER_ID), Some(json!(first.user_id)));
	assert_eq!(h.store.value(keys::IS_TRACKING), Some(json!(false)));
	assert_eq!(h.store.value(keys::SESSION_DATA), None);
}

#[tokio::test]
async fn tracking_state_is_written_through() {
	let doc = page();
	let paragraph = doc.resolve("/html/body/p[1]").unwrap();
	let mut h = restored().await;
	h.controller.start().unwrap();
	h.controller.dispatch(RawEvent::Click { target: paragraph }).unwrap();

	let persisted = h.controller.bridge().load().await.unwrap();
	assert!(persisted.is_tracking);
	assert_eq!(persisted.actions.len(), 2);
	assert_eq!(persisted.session_start, Some(10_000));
}

#[tokio::test]
async fn unreadable_state_is_discarded() {
	let mut entries = Map::new();
	entries.insert(keys::IS_TRACKING.into(), json!("yes"));
	let mut h = harness_with(Arc::new(MemoryStore::with_entries(entries)));

	assert_eq!(h.controller.restore().await.unwrap(), RestoreOutcome::Discarded);
	assert!(!h.controller.is_tracking());
	assert!(h.controller.start().unwrap());
}

#[tokio::test]
async fn closed_bridge_reports_error_status() {
	let clock = Arc::new(ManualClock::new(0));
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
	let (bridge, worker) = PersistenceBridge::new(store, PersistConfig::default());
	drop(worker);
	let mut controller = SessionController::new(RecordingHost::new(URL), bridge, clock, CaptureConfig::default());

	let response = controller.handle_command(CommandRequest::StartTracking).await;
	assert!(response.is_error());
	assert!(!controller.is_tracking());
}

#[tokio::test]
async fn transient_read_failure_is_retried_during_restore() {
	let store = FlakyStore::new(MemoryStore::with_entries(interrupted_entries(1_500, &[click(1_600, "/html/body/p[1]")])), 0);
	store.fail_reads(2);
	let mut controller = flaky_controller(&store);

	assert_eq!(controller.restore().await.unwrap(), RestoreOutcome::Resumed { actions: 1 });
	assert_eq!(store.read_attempts(), 3);
	assert_eq!(controller.user_id(), Some("user-7"));
	assert_eq!(controller.state().active().unwrap().session_start(), 1_500);
}

#[tokio::test]
async fn unreachable_store_leaves_interrupted_session_intact() {
	let store = FlakyStore::new(MemoryStore::with_entries(interrupted_entries(1_500, &[click(1_600, "/html/body/p[1]")])), 0);
	store.fail_reads(3);
	let mut controller = flaky_controller(&store);

	let err = controller.restore().await.unwrap_err();
	assert!(matches!(err, TrailError::Store(StoreError::Unavailable(_))), "{err}");
	assert!(!controller.is_restored());
	assert!(matches!(controller.start(), Err(TrailError::NotRestored)));
	controller.bridge().flush().await.unwrap();
	assert_eq!(store.write_attempts(), 0);
	assert_eq!(store.inner().value(keys::USER_ID), Some(json!("user-7")));

	// The store is reachable again on the next command.
	let response = controller.handle_command(CommandRequest::StopTracking).await;
	assert_eq!(response.status, STATUS_TRACKING_STOPPED);
	controller.bridge().flush().await.unwrap();

	let history: Vec<Session> = serde_json::from_value(store.inner().value(keys::SESSION_HISTORY).unwrap()).unwrap();
	assert_eq!(history.len(), 1);
	assert_eq!(history[0].user_id, "user-7");
	assert_eq!(history[0].session_start, 1_500);
	assert_eq!(type_names(&history[0]), ["click", "session_restored", "session_stopped"]);
}

#[tokio::test]
async fn stop_on_closed_bridge_keeps_session_active() {
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
	let (bridge, worker) = PersistenceBridge::new(store, PersistConfig::default());
	let handle = tokio::spawn(worker.run());
	let mut controller = SessionController::new(RecordingHost::new(URL), bridge, Arc::new(ManualClock::new(0)), CaptureConfig::default());
	controller.restore().await.unwrap();
	controller.start().unwrap();
	let listeners = controller.host().listener_count();
	assert!(listeners > 0);

	handle.abort();
	let _ = handle.await;

	assert!(matches!(controller.stop(), Err(TrailError::PersistenceClosed)));
	assert!(controller.is_tracking());
	assert_eq!(controller.host().listener_count(), listeners);
	assert_eq!(controller.state().active().unwrap().actions().len(), 1);

	let response = controller.handle_command(CommandRequest::StopTracking).await;
	assert!(response.is_error());
	assert!(controller.is_tracking());
}
