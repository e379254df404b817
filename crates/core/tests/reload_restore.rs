//! Sessions surviving a page reload through a shared store.

use std::sync::Arc;

use trail::dom::Document;
use trail::protocol::{CommandRequest, NavigationTrigger};
use trail::testing::{FlakyStore, RecordingHost};
use trail::{
	CaptureConfig, ManualClock, MemoryStore, PersistConfig, PersistenceBridge, RawEvent, RestoreOutcome, SessionController,
	export_batch, resolve_locator,
};

const PAGE: &str = r#"{
	"tag": "html",
	"children": [
		{ "tag": "head" },
		{
			"tag": "body",
			"children": [
				{ "tag": "nav", "children": [
					{ "tag": "a", "attrs": { "href": "/docs" }, "text": "Docs" },
					{ "tag": "a", "attrs": { "href": "/blog" }, "text": "Blog" }
				]},
				{ "tag": "input", "attrs": { "id": "q", "name": "q", "type": "search" }, "value": "rust" }
			]
		}
	]
}"#;

/// One page load: a controller over the shared store, restored.
async fn load_page(
	store: Arc<dyn trail::KeyValueStore>,
	clock: Arc<ManualClock>,
) -> (SessionController<RecordingHost>, RestoreOutcome) {
	let (bridge, worker) = PersistenceBridge::new(store, PersistConfig::default());
	tokio::spawn(worker.run());
	let mut controller =
		SessionController::new(RecordingHost::new("https://example.com/"), bridge, clock, CaptureConfig::default());
	let outcome = controller.restore().await.expect("restore should succeed");
	(controller, outcome)
}

#[tokio::test]
async fn session_survives_reload() {
	let doc = Document::from_json(PAGE).expect("page should parse");
	let store = Arc::new(MemoryStore::new());
	let clock = Arc::new(ManualClock::new(50_000));

	let (mut first, outcome) = load_page(store.clone(), clock.clone()).await;
	assert_eq!(outcome, RestoreOutcome::Idle);
	first.start().unwrap();
	let user_id = first.user_id().unwrap().to_string();

	let blog = doc.resolve("/html/body/nav[1]/a[2]").unwrap();
	clock.advance(100);
	first.dispatch(RawEvent::Click { target: blog }).unwrap();
	clock.advance(100);
	first
		.dispatch(RawEvent::<trail::dom::NodeRef<'_>>::Navigation {
			trigger: NavigationTrigger::PushState,
			url: "https://example.com/blog".into(),
		})
		.unwrap();
	let before_reload = first.state().active().unwrap().actions().to_vec();
	first.bridge().flush().await.unwrap();
	drop(first);

	clock.advance(1_000);
	let (mut second, outcome) = load_page(store.clone(), clock.clone()).await;
	assert_eq!(outcome, RestoreOutcome::Resumed { actions: 3 });
	assert_eq!(second.user_id(), Some(user_id.as_str()));

	let search = doc.get_element_by_id("q").unwrap();
	second.dispatch(RawEvent::Input { target: search }).unwrap();
	let response = second.handle_command(CommandRequest::StopTracking).await;
	assert!(!response.is_error(), "{}", response.status);

	let history = second.bridge().history().await.unwrap();
	assert_eq!(history.len(), 1);
	let session = &history[0];
	assert_eq!(session.session_start, 50_000);
	assert_eq!(session.actions[..3], before_reload[..]);
	let tail: Vec<_> = session.actions[3..].iter().map(|a| a.type_name()).collect();
	assert_eq!(tail, vec!["session_restored", "input", "session_stopped"]);

	let files = export_batch(&history).unwrap();
	assert_eq!(files.len(), 1);
	assert!(files[0].file_name.starts_with(&format!("session_{user_id}_")));
}

#[tokio::test]
async fn history_write_survives_transient_store_failure() {
	let store = FlakyStore::new(MemoryStore::new(), 0);
	let clock = Arc::new(ManualClock::new(1_000));

	let (mut controller, _) = load_page(store.clone(), clock.clone()).await;
	controller.start().unwrap();
	controller.bridge().flush().await.unwrap();

	store.fail_next(2);
	clock.advance(500);
	let session = controller.stop().unwrap().unwrap();

	let history = controller.bridge().history().await.unwrap();
	assert_eq!(history, vec![session]);
}

#[test]
fn locator_round_trips_through_snapshot() {
	let doc = Document::from_json(PAGE).unwrap();
	for element in doc.elements() {
		let locator = resolve_locator(&element);
		if locator.is_empty() {
			continue;
		}
		assert_eq!(doc.resolve(&locator), Some(element), "{locator}");
		assert_eq!(resolve_locator(&element), locator);
	}
}
