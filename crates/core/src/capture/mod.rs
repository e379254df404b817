//! Listener registration and raw event normalization.
//!
//! [`EventCapture`] owns the set of listeners registered on an [`EventHost`]
//! for one recording interval and turns [`RawEvent`]s into bounded
//! [`ActionKind`] payloads. Registration is explicit and reversible: every
//! listener and the navigation interceptor installed by
//! [`attach`](EventCapture::attach) is removed by
//! [`detach`](EventCapture::detach), so repeated start/stop cycles never
//! stack interceptors.

mod normalize;
mod throttle;


use tracing::{debug, trace};
use trail_protocol::{ActionKind, Navigation, NavigationTrigger, PointerMove};

pub use throttle::Throttle;

use crate::config::CaptureConfig;
use crate::element::Element;

/// Event families a host can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
	Click,
	Submit,
	Input,
	/// Back/forward history traversal.
	PopState,
	PointerMove,
}

impl ListenerKind {
	pub const ALL: [ListenerKind; 5] = [
		ListenerKind::Click,
		ListenerKind::Submit,
		ListenerKind::Input,
		ListenerKind::PopState,
		ListenerKind::PointerMove,
	];
}

/// Host-issued handle for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Host-issued handle for an installed navigation interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

/// The page surface capture attaches to.
pub trait EventHost {
	fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;

	fn remove_listener(&mut self, id: ListenerId);

	/// Wraps the navigation-state-change primitive (`pushState`/`replaceState`)
	/// so programmatic location changes arrive as [`RawEvent::Navigation`].
	fn intercept_navigation(&mut self) -> HookId;

	/// Puts back the primitive wrapped by [`intercept_navigation`](Self::intercept_navigation).
	fn restore_navigation(&mut self, hook: HookId);

	/// Current document location.
	fn location(&self) -> String;
}

/// Interaction as delivered by the host, before normalization.
#[derive(Debug, Clone)]
pub enum RawEvent<E> {
	Click { target: E },
	Submit { form: E },
	Input { target: E },
	/// Location change; `url` is the new location.
	Navigation { trigger: NavigationTrigger, url: String },
	PointerMove { x: f64, y: f64 },
}

impl<E> RawEvent<E> {
	/// Listener that must be registered for this event to be captured.
	/// Programmatic navigation is gated by the interceptor instead.
	fn listener(&self) -> Option<ListenerKind> {
		match self {
			RawEvent::Click { .. } => Some(ListenerKind::Click),
			RawEvent::Submit { .. } => Some(ListenerKind::Submit),
			RawEvent::Input { .. } => Some(ListenerKind::Input),
			RawEvent::Navigation {
				trigger: NavigationTrigger::Traversal,
				..
			} => Some(ListenerKind::PopState),
			RawEvent::Navigation { .. } => None,
			RawEvent::PointerMove { .. } => Some(ListenerKind::PointerMove),
		}
	}
}

#[derive(Debug)]
struct Registration {
	listeners: Vec<(ListenerKind, ListenerId)>,
	navigation_hook: HookId,
}

impl Registration {
	fn has(&self, kind: ListenerKind) -> bool {
		self.listeners.iter().any(|(registered, _)| *registered == kind)
	}
}

/// Registration state and normalization for one capture context.
#[derive(Debug)]
pub struct EventCapture {
	config: CaptureConfig,
	registration: Option<Registration>,
	pointer_throttle: Throttle,
	last_url: Option<String>,
}

impl EventCapture {
	pub fn new(config: CaptureConfig) -> Self {
		Self {
			pointer_throttle: Throttle::new(config.pointer_throttle_ms),
			config,
			registration: None,
			last_url: None,
		}
	}

	pub fn config(&self) -> &CaptureConfig {
		&self.config
	}

	pub fn is_attached(&self) -> bool {
		self.registration.is_some()
	}

	/// Registers listeners and the navigation interceptor. Returns false when
	/// already attached, in which case nothing is registered twice.
	pub fn attach<H: EventHost>(&mut self, host: &mut H) -> bool {
		if self.registration.is_some() {
			debug!(target = "trail.capture", "capture already attached");
			return false;
		}

		let listeners: Vec<_> = ListenerKind::ALL
			.into_iter()
			.filter(|kind| *kind != ListenerKind::PointerMove || self.config.pointer_moves)
			.map(|kind| (kind, host.add_listener(kind)))
			.collect();
		let navigation_hook = host.intercept_navigation();

		debug!(
			target = "trail.capture",
			listeners = listeners.len(),
			hook = navigation_hook.0,
			"capture attached"
		);

		self.pointer_throttle.reset();
		self.last_url = Some(host.location());
		self.registration = Some(Registration { listeners, navigation_hook });
		true
	}

	/// Removes exactly what [`attach`](Self::attach) registered. Returns false
	/// when nothing was attached.
	pub fn detach<H: EventHost>(&mut self, host: &mut H) -> bool {
		let Some(registration) = self.registration.take() else {
			return false;
		};

		let count = registration.listeners.len();
		for (_, id) in registration.listeners {
			host.remove_listener(id);
		}
		host.restore_navigation(registration.navigation_hook);
		self.last_url = None;

		debug!(target = "trail.capture", listeners = count, "capture detached");
		true
	}

	/// Normalizes one raw event. Returns `None` when capture is detached, the
	/// event's listener is not registered, or the event is throttled.
	pub fn capture<E: Element>(&mut self, event: &RawEvent<E>, now_ms: u64, url: &str) -> Option<ActionKind> {
		let registration = self.registration.as_ref()?;
		if let Some(kind) = event.listener() {
			if !registration.has(kind) {
				return None;
			}
		}

		let kind = match event {
			RawEvent::Click { target } => normalize::classify_click(target, url, &self.config),
			RawEvent::Submit { form } => ActionKind::FormSubmit(normalize::form_submit(form, url)),
			RawEvent::Input { target } => ActionKind::Input(normalize::field_input(target, &self.config)),
			RawEvent::Navigation { trigger, url: to } => {
				let from = self.last_url.replace(to.clone());
				ActionKind::Navigation(Navigation {
					trigger: *trigger,
					from,
					to: to.clone(),
				})
			}
			RawEvent::PointerMove { x, y } => {
				if !self.pointer_throttle.admit(now_ms) {
					trace!(target = "trail.capture", now_ms, "pointer move throttled");
					return None;
				}
				ActionKind::PointerMove(PointerMove { x: *x, y: *y })
			}
		};

		trace!(target = "trail.capture", kind = kind.type_name(), "event captured");
		Some(kind)
	}
}
