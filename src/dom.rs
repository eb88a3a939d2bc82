//! Parse, query and serialize HTML for the transforms.
//!
//! Every HTML transform follows the same shape: parse the file's text into a
//! tree, collect the elements it cares about, mutate them, and serialize the
//! tree back into the file's text. This module wraps [`kuchikiki`] so that
//! shape stays small at each call site.
//!
//! ## Documents vs Fragments
//!
//! The HTML parser always builds a full `<html><head></head><body>` tree.
//! Include fragments (`includes/footer.html` holding a bare `<footer>`) must
//! not come back out wrapped in that scaffolding, so [`HtmlDoc`] remembers
//! whether the source was a document and serializes fragments as the
//! concatenation of the synthetic `<head>` and `<body>` children.

use kuchikiki::traits::*;
use kuchikiki::{ElementData, NodeDataRef, NodeRef};

/// A parsed HTML file.
pub struct HtmlDoc {
    root: NodeRef,
    fragment: bool,
}

impl HtmlDoc {
    pub fn parse(text: &str) -> Self {
        Self {
            root: kuchikiki::parse_html().one(text),
            fragment: !is_document(text),
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// All elements in document order for which `pred` holds.
    ///
    /// The result is collected before returning so callers can detach or
    /// insert nodes while walking it.
    pub fn elements_where<F>(&self, mut pred: F) -> Vec<NodeDataRef<ElementData>>
    where
        F: FnMut(&ElementData) -> bool,
    {
        self.root
            .descendants()
            .elements()
            .filter(|el| pred(el))
            .collect()
    }

    /// Serialize back to text, without scaffolding for fragments.
    pub fn serialize(&self) -> String {
        if !self.fragment {
            return self.root.to_string();
        }
        content_nodes(&self.root)
            .iter()
            .map(|node| node.to_string())
            .collect()
    }
}

/// Elements whose content is text, never markup.
const RAW_TEXT: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

/// True when `text` is a whole document rather than a fragment: it has a
/// doctype or an `<html>`, `<head>` or `<body>` tag. Comments and the
/// content of raw text elements like `<script>` are not looked at.
pub fn is_document(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let mut rest = lower.as_str();
    while let Some(lt) = rest.find('<') {
        rest = &rest[lt..];
        if let Some(comment) = rest.strip_prefix("<!--") {
            let Some(end) = comment.find("-->") else {
                return false;
            };
            rest = &comment[end + 3..];
            continue;
        }
        if rest.starts_with("<!doctype") {
            return true;
        }
        match opening_tag(rest) {
            Some("html" | "head" | "body") => return true,
            Some(name) if RAW_TEXT.contains(&name) => {
                let close = format!("</{name}");
                let Some(end) = rest.find(&close) else {
                    return false;
                };
                rest = &rest[end + close.len()..];
            }
            _ => rest = &rest[1..],
        }
    }
    false
}

/// Name of the tag opening at the start of `s`, which begins with `<`.
/// The name must end at `>`, `/` or whitespace, so `<head` doesn't match
/// `<header>`.
fn opening_tag(s: &str) -> Option<&str> {
    let body = &s[1..];
    let end = body.find(|c: char| !c.is_ascii_alphanumeric())?;
    let (name, next) = body.split_at(end);
    let closed = next.starts_with(|c: char| c == '>' || c == '/' || c.is_ascii_whitespace());
    (!name.is_empty() && closed).then_some(name)
}

/// Top-level nodes of a parsed fragment, in source order: document-level
/// comments, then the synthetic `<head>` children, then the `<body>` children.
fn content_nodes(root: &NodeRef) -> Vec<NodeRef> {
    let mut nodes = Vec::new();
    for child in root.children() {
        if child.as_doctype().is_some() {
            continue;
        }
        if is_element(&child, "html") {
            for section in child.children() {
                if is_element(&section, "head") || is_element(&section, "body") {
                    nodes.extend(section.children());
                } else {
                    nodes.push(section);
                }
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

/// Parse an HTML snippet into detached top-level nodes ready to insert
/// elsewhere.
pub fn parse_nodes(html: &str) -> Vec<NodeRef> {
    let root = kuchikiki::parse_html().one(html);
    let nodes = content_nodes(&root);
    for node in &nodes {
        node.detach();
    }
    nodes
}

/// Build a detached element from an opening tag, e.g. `<script src="/a.js">`.
/// The closing tag is added here.
pub fn new_element(open_tag: &str, tag: &str) -> Option<NodeRef> {
    parse_nodes(&format!("{open_tag}</{tag}>"))
        .into_iter()
        .find(|n| is_element(n, tag))
}

/// Insert `nodes` directly after `anchor`, keeping their order.
pub fn insert_all_after(anchor: &NodeRef, nodes: &[NodeRef]) {
    let mut cursor = anchor.clone();
    for node in nodes {
        cursor.insert_after(node.clone());
        cursor = node.clone();
    }
}

pub fn is_element(node: &NodeRef, tag: &str) -> bool {
    node.as_element().is_some_and(|el| tag_name(el) == tag)
}

/// Lowercase local tag name.
pub fn tag_name(el: &ElementData) -> &str {
    el.name.local.as_ref()
}

pub fn attr(el: &ElementData, name: &str) -> Option<String> {
    el.attributes.borrow().get(name).map(str::to_string)
}

pub fn has_attr(el: &ElementData, name: &str) -> bool {
    el.attributes.borrow().contains(name)
}

pub fn has_any_attr(el: &ElementData, names: &[String]) -> bool {
    names.iter().any(|n| has_attr(el, n))
}

/// The first of `names` present on the element with a non-empty value,
/// as `(name, value)`.
pub fn first_attr_value(el: &ElementData, names: &[String]) -> Option<(String, String)> {
    let attrs = el.attributes.borrow();
    names.iter().find_map(|name| {
        attrs
            .get(name.as_str())
            .filter(|v| !v.trim().is_empty())
            .map(|v| (name.clone(), v.trim().to_string()))
    })
}

/// All attributes as `(name, value)` pairs.
pub fn attributes(el: &ElementData) -> Vec<(String, String)> {
    el.attributes
        .borrow()
        .map
        .iter()
        .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
        .collect()
}

pub fn set_attr(el: &ElementData, name: &str, value: &str) {
    el.attributes.borrow_mut().insert(name, value.to_string());
}

/// Append `class` to the element's class list unless already present.
pub fn add_class(el: &ElementData, class: &str) {
    let mut attrs = el.attributes.borrow_mut();
    let current = attrs.get("class").unwrap_or_default().to_string();
    if current.split_whitespace().any(|c| c == class) {
        return;
    }
    let updated = if current.trim().is_empty() {
        class.to_string()
    } else {
        format!("{} {}", current.trim(), class)
    };
    attrs.insert("class", updated);
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
