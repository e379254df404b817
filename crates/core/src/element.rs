//! Element capability consumed by the locator and the capture handlers.

/// Read-only view of a document element.
///
/// Implementations must compare equal only when both handles refer to the
/// same node; the locator relies on that to find an element among its
/// siblings.
pub trait Element: Clone + PartialEq {
	/// Lowercase tag name.
	fn tag_name(&self) -> String;

	fn attribute(&self, name: &str) -> Option<String>;

	/// Parent element, `None` for the document element and detached roots.
	fn parent(&self) -> Option<Self>;

	/// Element children in document order. Text and comment nodes are skipped.
	fn children(&self) -> Vec<Self>;

	/// True for the document's root content container (`document.body`).
	fn is_body(&self) -> bool;

	/// Concatenated text of the element and its descendants.
	fn text_content(&self) -> String;

	/// Current value of a form control, if the element has one.
	fn value(&self) -> Option<String>;

	/// Non-empty `id` attribute.
	fn id(&self) -> Option<String> {
		self.attribute("id").filter(|id| !id.is_empty())
	}

	fn class_list(&self) -> Vec<String> {
		self.attribute("class")
			.map(|class| class.split_whitespace().map(String::from).collect())
			.unwrap_or_default()
	}

	fn role(&self) -> Option<String> {
		self.attribute("role").map(|role| role.trim().to_ascii_lowercase())
	}

	/// Nearest inclusive ancestor matching `predicate`.
	fn closest(&self, predicate: impl Fn(&Self) -> bool) -> Option<Self> {
		let mut current = Some(self.clone());
		while let Some(element) = current {
			if predicate(&element) {
				return Some(element);
			}
			current = element.parent();
		}
		None
	}

	/// All descendants in document order, excluding `self`.
	fn descendants(&self) -> Vec<Self> {
		let mut out = Vec::new();
		let mut stack: Vec<Self> = self.children().into_iter().rev().collect();
		while let Some(element) = stack.pop() {
			stack.extend(element.children().into_iter().rev());
			out.push(element);
		}
		out
	}
}
