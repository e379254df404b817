//! Normalized interaction records.

use serde::{Deserialize, Serialize};

/// One captured interaction.
///
/// Serialized as a flat object: `{"type": ..., "timestamp": ..., "url": ..., ...}`
/// where the remaining fields depend on the variant of [`ActionKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
	/// Milliseconds since the Unix epoch.
	pub timestamp: u64,
	/// Document location at capture time.
	pub url: String,
	#[serde(flatten)]
	pub kind: ActionKind,
}

impl Action {
	pub fn new(timestamp: u64, url: impl Into<String>, kind: ActionKind) -> Self {
		Self {
			timestamp,
			url: url.into(),
			kind,
		}
	}

	/// Wire name of the action type.
	pub fn type_name(&self) -> &'static str {
		self.kind.type_name()
	}
}

/// Action payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
	SessionStarted,
	SessionStopped,
	SessionRestored,
	Click(ClickTarget),
	NavigationClick(LinkClick),
	ButtonClick(ClickTarget),
	FormSubmit(FormSubmit),
	Input(FieldInput),
	Navigation(Navigation),
	PointerMove(PointerMove),
}

impl ActionKind {
	pub fn type_name(&self) -> &'static str {
		match self {
			ActionKind::SessionStarted => "session_started",
			ActionKind::SessionStopped => "session_stopped",
			ActionKind::SessionRestored => "session_restored",
			ActionKind::Click(_) => "click",
			ActionKind::NavigationClick(_) => "navigation_click",
			ActionKind::ButtonClick(_) => "button_click",
			ActionKind::FormSubmit(_) => "form_submit",
			ActionKind::Input(_) => "input",
			ActionKind::Navigation(_) => "navigation",
			ActionKind::PointerMove(_) => "pointer_move",
		}
	}

	/// Session lifecycle markers carry no interaction payload.
	pub fn is_marker(&self) -> bool {
		matches!(
			self,
			ActionKind::SessionStarted | ActionKind::SessionStopped | ActionKind::SessionRestored
		)
	}
}

/// Element fields recorded for every click classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickTarget {
	/// Lowercase tag name of the event target.
	pub tag: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub class_list: Vec<String>,
	/// Truncated visible text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
	pub xpath: String,
}

/// A click inside an anchor-like ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkClick {
	#[serde(flatten)]
	pub target: ClickTarget,
	/// Resolved link target of the anchor ancestor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub href: Option<String>,
	/// Truncated visible text of the anchor ancestor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmit {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub form_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action: Option<String>,
	/// Submission method, lowercase. Defaults to `get` like the DOM does.
	pub method: String,
	pub xpath: String,
	pub field_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInput {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub tag: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub input_type: Option<String>,
	/// Truncated field value, or text content for editable non-form elements.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	pub xpath: String,
}

/// What caused a location change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTrigger {
	/// Back/forward history traversal.
	Traversal,
	PushState,
	ReplaceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
	pub trigger: NavigationTrigger,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	pub to: String,
}

/// Pointer position in client coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerMove {
	pub x: f64,
	pub y: f64,
}
