//! Raw element data to bounded action payloads.

use trail_protocol::{ActionKind, ClickTarget, FieldInput, FormSubmit, LinkClick};
use url::Url;

use crate::config::CaptureConfig;
use crate::element::Element;
use crate::locator::resolve_locator;

/// Keeps at most `limit` characters of `text`.
pub(crate) fn truncate(text: &str, limit: usize) -> String {
	match text.char_indices().nth(limit) {
		Some((byte_index, _)) => text[..byte_index].to_string(),
		None => text.to_string(),
	}
}

fn visible_text<E: Element>(element: &E, limit: usize) -> Option<String> {
	let text = element.text_content();
	let text = text.trim();
	(!text.is_empty()).then(|| truncate(text, limit))
}

/// Resolves `href` against the document location; keeps it verbatim when
/// either side is not a valid URL.
pub(crate) fn resolve_href(base: &str, href: &str) -> String {
	Url::parse(base)
		.and_then(|base| base.join(href))
		.map(String::from)
		.unwrap_or_else(|_| href.to_string())
}

pub(crate) fn is_link<E: Element>(element: &E) -> bool {
	let tag = element.tag_name();
	((tag == "a" || tag == "area") && element.attribute("href").is_some()) || element.role().as_deref() == Some("link")
}

pub(crate) fn is_button<E: Element>(element: &E) -> bool {
	if element.tag_name() == "button" || element.role().as_deref() == Some("button") {
		return true;
	}
	element.tag_name() == "input"
		&& element
			.attribute("type")
			.is_some_and(|kind| matches!(kind.to_ascii_lowercase().as_str(), "button" | "submit" | "reset"))
}

fn click_target<E: Element>(element: &E, config: &CaptureConfig) -> ClickTarget {
	ClickTarget {
		tag: element.tag_name(),
		id: element.id(),
		class_list: element.class_list(),
		text: visible_text(element, config.text_limit),
		xpath: resolve_locator(element),
	}
}

/// Classifies a click. Precedence is fixed: plain `click`, then
/// `navigation_click` inside a link, then `button_click`, each later rule
/// overriding the earlier one.
pub(crate) fn classify_click<E: Element>(element: &E, url: &str, config: &CaptureConfig) -> ActionKind {
	let target = click_target(element, config);
	let mut kind = ActionKind::Click(target.clone());

	if let Some(link) = element.closest(is_link) {
		kind = ActionKind::NavigationClick(LinkClick {
			target: target.clone(),
			href: link.attribute("href").map(|href| resolve_href(url, &href)),
			link_text: visible_text(&link, config.text_limit),
		});
	}

	if is_button(element) {
		kind = ActionKind::ButtonClick(target);
	}

	kind
}

fn is_listed_control<E: Element>(element: &E) -> bool {
	match element.tag_name().as_str() {
		"select" | "textarea" | "button" | "fieldset" | "output" | "object" => true,
		"input" => !element.attribute("type").is_some_and(|kind| kind.eq_ignore_ascii_case("image")),
		_ => false,
	}
}

pub(crate) fn form_submit<E: Element>(form: &E, url: &str) -> FormSubmit {
	let action = match form.attribute("action") {
		Some(action) if !action.trim().is_empty() => resolve_href(url, action.trim()),
		_ => url.to_string(),
	};
	let method = form
		.attribute("method")
		.map(|method| method.trim().to_ascii_lowercase())
		.filter(|method| matches!(method.as_str(), "get" | "post" | "dialog"))
		.unwrap_or_else(|| "get".to_string());

	FormSubmit {
		form_id: form.id(),
		name: form.attribute("name"),
		action: Some(action),
		method,
		xpath: resolve_locator(form),
		field_count: form.descendants().iter().filter(|el| is_listed_control(*el)).count(),
	}
}

fn input_type<E: Element>(element: &E) -> Option<String> {
	match element.tag_name().as_str() {
		"input" => Some(
			element
				.attribute("type")
				.map(|kind| kind.to_ascii_lowercase())
				.filter(|kind| !kind.is_empty())
				.unwrap_or_else(|| "text".to_string()),
		),
		"textarea" => Some("textarea".to_string()),
		"select" if element.attribute("multiple").is_some() => Some("select-multiple".to_string()),
		"select" => Some("select-one".to_string()),
		_ => None,
	}
}

pub(crate) fn field_input<E: Element>(element: &E, config: &CaptureConfig) -> FieldInput {
	let value = element
		.value()
		.filter(|value| !value.is_empty())
		.or_else(|| Some(element.text_content()).filter(|text| !text.is_empty()))
		.map(|value| truncate(&value, config.value_limit));

	FieldInput {
		id: element.id(),
		name: element.attribute("name"),
		tag: element.tag_name(),
		input_type: input_type(element),
		value,
		xpath: resolve_locator(element),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn truncate_counts_characters_not_bytes() {
		assert_eq!(truncate("héllo wörld", 7), "héllo w");
		assert_eq!(truncate("short", 100), "short");
		assert_eq!(truncate("", 3), "");
		assert_eq!(truncate("абв", 0), "");
	}

	#[test]
	fn relative_href_resolves_against_location() {
		assert_eq!(resolve_href("https://example.com/a/b", "../c?x=1"), "https://example.com/c?x=1");
		assert_eq!(resolve_href("https://example.com/", "mailto:me@example.com"), "mailto:me@example.com");
		assert_eq!(resolve_href("not a url", "/docs"), "/docs");
	}
}
