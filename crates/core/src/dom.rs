//! In-memory document snapshots.
//!
//! [`Document`] is an arena-backed element tree implementing [`Element`]. It
//! backs the replayer (snapshots are loaded from JSON) and the test suites,
//! and offers [`Document::resolve`], the inverse of
//! [`resolve_locator`](crate::locator::resolve_locator).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::locator::ROOT_PATH;

/// Serializable description of an element subtree.
///
/// ```json
/// {"tag": "a", "attrs": {"href": "/docs"}, "text": "Docs", "children": []}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
	pub tag: String,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub attrs: BTreeMap<String, String>,
	/// Text placed before the children.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
	/// Form control value.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<NodeSpec>,
}

impl NodeSpec {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			..Default::default()
		}
	}

	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attrs.insert(name.into(), value.into());
		self
	}

	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	pub fn child(mut self, child: NodeSpec) -> Self {
		self.children.push(child);
		self
	}
}

#[derive(Debug, Clone)]
struct NodeData {
	tag: String,
	attrs: BTreeMap<String, String>,
	text: Option<String>,
	value: Option<String>,
	parent: Option<usize>,
	children: Vec<usize>,
}

/// Arena-backed element tree. Index 0 is the root.
#[derive(Debug, Clone)]
pub struct Document {
	nodes: Vec<NodeData>,
	body: Option<usize>,
}

impl Document {
	/// Builds a document from a root spec. When the root is `<html>`, its first
	/// `<body>` child becomes the root content container.
	pub fn from_spec(root: NodeSpec) -> Self {
		let mut nodes = Vec::new();
		insert(&mut nodes, root, None);

		let body = (nodes[0].tag == "html")
			.then(|| nodes[0].children.iter().copied().find(|&idx| nodes[idx].tag == "body"))
			.flatten();

		Self { nodes, body }
	}

	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		let spec: NodeSpec = serde_json::from_str(json)?;
		Ok(Self::from_spec(spec))
	}

	pub fn root(&self) -> NodeRef<'_> {
		NodeRef { doc: self, index: 0 }
	}

	pub fn body(&self) -> Option<NodeRef<'_>> {
		self.body.map(|index| NodeRef { doc: self, index })
	}

	/// First element in document order whose `id` equals `id`.
	pub fn get_element_by_id(&self, id: &str) -> Option<NodeRef<'_>> {
		self.nodes
			.iter()
			.position(|node| node.attrs.get("id").is_some_and(|v| v == id))
			.map(|index| NodeRef { doc: self, index })
	}

	/// All elements in document order.
	pub fn elements(&self) -> impl Iterator<Item = NodeRef<'_>> {
		(0..self.nodes.len()).map(move |index| NodeRef { doc: self, index })
	}

	/// Finds the element a locator points at.
	///
	/// Accepts the two locator roots (`//*[@id="..."]` and `/html/body`)
	/// followed by any number of `tag[n]` steps.
	pub fn resolve(&self, locator: &str) -> Option<NodeRef<'_>> {
		let (mut current, rest) = if let Some(rest) = locator.strip_prefix("//*[@id=\"") {
			let end = rest.find("\"]")?;
			(self.get_element_by_id(&rest[..end])?, &rest[end + 2..])
		} else if let Some(rest) = locator.strip_prefix(ROOT_PATH) {
			if !(rest.is_empty() || rest.starts_with('/')) {
				return None;
			}
			(self.body()?, rest)
		} else {
			return None;
		};

		for segment in rest.split('/').filter(|s| !s.is_empty()) {
			let (tag, ordinal) = parse_step(segment)?;
			current = current
				.children()
				.into_iter()
				.filter(|child| child.tag_name() == tag)
				.nth(ordinal - 1)?;
		}
		Some(current)
	}
}

fn insert(nodes: &mut Vec<NodeData>, spec: NodeSpec, parent: Option<usize>) -> usize {
	let index = nodes.len();
	nodes.push(NodeData {
		tag: spec.tag.to_ascii_lowercase(),
		attrs: spec.attrs,
		text: spec.text,
		value: spec.value,
		parent,
		children: Vec::new(),
	});
	for child in spec.children {
		let child_index = insert(nodes, child, Some(index));
		nodes[index].children.push(child_index);
	}
	index
}

/// Parses `tag[n]` with `n >= 1`.
fn parse_step(step: &str) -> Option<(&str, usize)> {
	let (tag, rest) = step.split_once('[')?;
	let ordinal: usize = rest.strip_suffix(']')?.parse().ok()?;
	(ordinal >= 1 && !tag.is_empty()).then_some((tag, ordinal))
}

/// Handle to one element of a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
	doc: &'a Document,
	index: usize,
}

impl NodeRef<'_> {
	fn data(&self) -> &NodeData {
		&self.doc.nodes[self.index]
	}
}

impl PartialEq for NodeRef<'_> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self.doc, other.doc) && self.index == other.index
	}
}

impl fmt::Debug for NodeRef<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<{}#{}>", self.data().tag, self.index)
	}
}

impl Element for NodeRef<'_> {
	fn tag_name(&self) -> String {
		self.data().tag.clone()
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.data().attrs.get(name).cloned()
	}

	fn parent(&self) -> Option<Self> {
		self.data().parent.map(|index| NodeRef { doc: self.doc, index })
	}

	fn children(&self) -> Vec<Self> {
		self.data().children.iter().map(|&index| NodeRef { doc: self.doc, index }).collect()
	}

	fn is_body(&self) -> bool {
		self.doc.body == Some(self.index)
	}

	fn text_content(&self) -> String {
		let mut text = self.data().text.clone().unwrap_or_default();
		for child in self.children() {
			text.push_str(&child.text_content());
		}
		text
	}

	fn value(&self) -> Option<String> {
		self.data().value.clone()
	}
}
