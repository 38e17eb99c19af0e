//! Helpers over the scraper/ego-tree DOM.

use std::collections::BTreeMap;

use ego_tree::NodeId;
use scraper::node::{Element, Node};
use scraper::{ElementRef, Html};

/// Name reported for the parent of the document element.
pub(crate) const DOCUMENT_NAME: &str = "#document";

/// Parse an HTML fragment. The content ends up under `<body>`, including
/// head-only tags such as `<meta>` or `<script>` that lead the fragment.
pub fn parse_fragment(fragment: &str) -> Html {
    Html::parse_document(&format!("<body>{fragment}</body>"))
}

/// Parse a complete HTML document.
pub fn parse_document(document: &str) -> Html {
    Html::parse_document(document)
}

/// Serialize the content of `<body>`, i.e. the fragment a caller passed to
/// [`parse_fragment`].
pub fn fragment_html(html: &Html) -> String {
    body_id(html)
        .and_then(|id| html.tree.get(id))
        .and_then(ElementRef::wrap)
        .map(|body| body.inner_html())
        .unwrap_or_default()
}

/// Serialize the whole document.
pub fn document_html(html: &Html) -> String {
    html.html()
}

/// The `<html>` element.
pub(crate) fn document_element_id(html: &Html) -> Option<NodeId> {
    html.tree
        .root()
        .children()
        .find(|node| element_named(node.value(), "html"))
        .map(|node| node.id())
}

/// The `<body>` element.
pub(crate) fn body_id(html: &Html) -> Option<NodeId> {
    let root = html.tree.get(document_element_id(html)?)?;
    root.children()
        .find(|node| element_named(node.value(), "body"))
        .map(|node| node.id())
}

fn element_named(node: &Node, name: &str) -> bool {
    matches!(node, Node::Element(el) if el.name() == name)
}

/// Tag name of the element at `id`.
pub(crate) fn element_name(html: &Html, id: NodeId) -> Option<&str> {
    match html.tree.get(id)?.value() {
        Node::Element(el) => Some(el.name()),
        _ => None,
    }
}

/// Name of the node's parent: its tag name, or `#document` at the top.
pub(crate) fn parent_name(html: &Html, id: NodeId) -> String {
    let Some(parent) = html.tree.get(id).and_then(|node| node.parent()) else {
        return DOCUMENT_NAME.to_string();
    };
    match parent.value() {
        Node::Element(el) => el.name().to_string(),
        _ => DOCUMENT_NAME.to_string(),
    }
}

/// Attribute name as written in markup, keeping any namespace prefix.
pub(crate) fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

/// Attribute names of an element in document order.
pub(crate) fn attr_names(el: &Element) -> Vec<String> {
    el.attrs
        .iter()
        .map(|(name, _)| qualified(name.prefix.as_deref(), name.local.as_ref()))
        .collect()
}

/// Attribute value by qualified name.
pub(crate) fn attr_value<'a>(el: &'a Element, name: &str) -> Option<&'a str> {
    el.attrs
        .iter()
        .find(|(qual, _)| qualified(qual.prefix.as_deref(), qual.local.as_ref()) == name)
        .map(|(_, value)| value.as_ref())
}

/// Snapshot of an element's attributes.
pub(crate) fn attributes(el: &Element) -> BTreeMap<String, String> {
    el.attrs
        .iter()
        .map(|(name, value)| {
            (
                qualified(name.prefix.as_deref(), name.local.as_ref()),
                value.to_string(),
            )
        })
        .collect()
}

/// Element data for the node at `id`.
pub(crate) fn element(html: &Html, id: NodeId) -> Option<&Element> {
    match html.tree.get(id)?.value() {
        Node::Element(el) => Some(el),
        _ => None,
    }
}

/// Remove the named attribute. Returns whether it was present.
pub(crate) fn remove_attr(html: &mut Html, id: NodeId, name: &str) -> bool {
    let Some(mut node) = html.tree.get_mut(id) else {
        return false;
    };
    let Node::Element(el) = node.value() else {
        return false;
    };
    let before = el.attrs.len();
    el.attrs
        .retain(|(qual, _)| qualified(qual.prefix.as_deref(), qual.local.as_ref()) != name);
    el.attrs.len() != before
}

/// Detach the node and its subtree.
pub(crate) fn detach(html: &mut Html, id: NodeId) {
    if let Some(mut node) = html.tree.get_mut(id) {
        node.detach();
    }
}

/// Move the node's children in front of it, preserving order, then detach the
/// node. Returns the promoted child ids.
pub(crate) fn replace_with_children(html: &mut Html, id: NodeId) -> Vec<NodeId> {
    let children: Vec<NodeId> = match html.tree.get(id) {
        Some(node) => node.children().map(|child| child.id()).collect(),
        None => return Vec::new(),
    };
    for &child in &children {
        if let Some(mut child_node) = html.tree.get_mut(child) {
            child_node.detach();
        }
        if let Some(mut node) = html.tree.get_mut(id) {
            node.insert_id_before(child);
        }
    }
    detach(html, id);
    children
}

/// Concatenated text of all descendant text nodes.
pub(crate) fn text_content(html: &Html, id: NodeId) -> String {
    let Some(node) = html.tree.get(id) else {
        return String::new();
    };
    node.descendants()
        .filter_map(|n| match n.value() {
            Node::Text(text) => Some::<&str>(text.as_ref()),
            _ => None,
        })
        .collect()
}

/// Element children of the node, in order.
pub(crate) fn element_children(html: &Html, id: NodeId) -> Vec<NodeId> {
    html.tree
        .get(id)
        .map(|node| {
            node.children()
                .filter(|child| matches!(child.value(), Node::Element(_)))
                .map(|child| child.id())
                .collect()
        })
        .unwrap_or_default()
}

/// Tag names of the node's element ancestors, nearest first.
pub(crate) fn ancestor_names(html: &Html, id: NodeId) -> Vec<&str> {
    let Some(node) = html.tree.get(id) else {
        return Vec::new();
    };
    node.ancestors()
        .filter_map(|a| match a.value() {
            Node::Element(el) => Some(el.name()),
            _ => None,
        })
        .collect()
}

/// Whether the node is still attached beneath `root` (or is `root`).
pub(crate) fn is_within(html: &Html, id: NodeId, root: NodeId) -> bool {
    if id == root {
        return true;
    }
    html.tree
        .get(id)
        .is_some_and(|node| node.ancestors().any(|a| a.id() == root))
}
