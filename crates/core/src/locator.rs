//! Structural element locators.
//!
//! A locator is an XPath-like string that re-identifies an element in an
//! exported log without holding a reference to the live node:
//!
//! * `//*[@id="checkout"]` for elements carrying an id
//! * `/html/body` for the root content container
//! * `<parent>/<tag>[<n>]` otherwise, `n` being the 1-based position among
//!   siblings sharing the tag
//!
//! Elements whose ancestor chain never reaches the body or an id-carrying
//! ancestor (detached subtrees, `<head>` content) resolve to an empty string.

use crate::element::Element;

/// Locator of `document.body`.
pub const ROOT_PATH: &str = "/html/body";

/// Computes the locator of `element`. Never fails; rootless elements yield `""`.
pub fn resolve_locator<E: Element>(element: &E) -> String {
	locate(element).unwrap_or_default()
}

fn locate<E: Element>(element: &E) -> Option<String> {
	if let Some(id) = element.id() {
		return Some(format!("//*[@id=\"{id}\"]"));
	}
	if element.is_body() {
		return Some(ROOT_PATH.to_string());
	}

	let parent = element.parent()?;
	let tag = element.tag_name();
	let ordinal = sibling_ordinal(&parent, element, &tag)?;
	let parent_path = locate(&parent)?;
	Some(format!("{parent_path}/{tag}[{ordinal}]"))
}

/// 1-based position of `element` among `parent`'s children with the same tag.
fn sibling_ordinal<E: Element>(parent: &E, element: &E, tag: &str) -> Option<usize> {
	let mut ordinal = 0;
	for sibling in parent.children() {
		if sibling.tag_name() == tag {
			ordinal += 1;
		}
		if sibling == *element {
			return Some(ordinal);
		}
	}
	None
}
