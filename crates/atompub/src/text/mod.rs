//! # Atom Text Constructs
//!
//! Reading and writing the RFC 4287 text constructs (`title`, `summary`, `content`,
//! `rights`, ...) of a parsed entry or feed. The `type` attribute selects how the value
//! is carried:
//!
//! - `text` and `html` values are the element's character data, verbatim.
//! - `xhtml` values are inline markup wrapped in a single XHTML `div`. The value read
//!   back is the markup inside that wrapper, re-serialized without namespace prefixes or
//!   declarations.
//!
//! Date constructs and a small word-wrap helper for rendering values live alongside.

mod date;
mod wrap;

pub use date::{read_date, DateError};
pub use wrap::wrap;

use std::fmt;

use xmltree::{Element, XMLNode};

use crate::xml::{self, QName, XHTML};

/// The kind of a text construct, taken from its `type` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Html,
    Xhtml,
    /// Any other `type`, kept as given. Values of such constructs are not interpreted.
    Other(String),
}

impl TextKind {
    /// Normalize a `type` attribute, mapping the equivalent MIME types onto the Atom kinds.
    pub fn from_type(t: &str) -> Self {
        match t {
            "text" | "text/plain" => TextKind::Text,
            "html" | "text/html" => TextKind::Html,
            "xhtml" | "application/xhtml+xml" => TextKind::Xhtml,
            other => TextKind::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TextKind::Text => "text",
            TextKind::Html => "html",
            TextKind::Xhtml => "xhtml",
            TextKind::Other(s) => s,
        }
    }
}

impl fmt::Display for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TextKind {
    fn from(s: &str) -> Self {
        TextKind::from_type(s)
    }
}

/// Read the text construct `name` from the children of `tree`.
///
/// A missing element reads as empty `text`.
pub fn read_text<'a>(tree: &Element, name: impl Into<QName<'a>>) -> (TextKind, String) {
    let name = name.into();
    let Some(element) = xml::child(tree, name) else {
        return (TextKind::Text, String::new());
    };

    let kind = element
        .attributes
        .get("type")
        .map(|t| TextKind::from_type(t))
        .unwrap_or(TextKind::Text);

    let value = match kind {
        TextKind::Text | TextKind::Html => xml::text(element),
        TextKind::Xhtml => xml::child(element, QName::new(XHTML, "div"))
            .map(inner_markup)
            .unwrap_or_default(),
        TextKind::Other(_) => String::new(),
    };

    (kind, value)
}

/// Replace the text construct `name` on `tree`, creating it when missing.
///
/// An `xhtml` value that is not well-formed markup is stored as `html` instead.
pub fn write_text<'a>(
    tree: &mut Element,
    name: impl Into<QName<'a>>,
    kind: TextKind,
    value: &str,
) {
    let name = name.into();
    let index = tree
        .children
        .iter()
        .position(|node| xml::as_element(node).is_some_and(|e| name.matches(e)));
    let index = match index {
        Some(i) => i,
        None => {
            let child = xml::new_child(tree, name);
            tree.children.push(XMLNode::Element(child));
            tree.children.len() - 1
        }
    };
    let XMLNode::Element(element) = &mut tree.children[index] else {
        return;
    };

    element.children.clear();
    match kind {
        TextKind::Xhtml => match wrap_xhtml(value) {
            Ok(div) => element.children.push(XMLNode::Element(div)),
            Err(e) => {
                tracing::debug!(
                    element = %name,
                    error = %e,
                    "xhtml value is not well-formed, storing as html"
                );
                element.children.push(XMLNode::Text(value.to_owned()));
                element.attributes.insert("type".into(), TextKind::Html.to_string());
                return;
            }
        },
        _ => element.children.push(XMLNode::Text(value.to_owned())),
    }
    element.attributes.insert("type".into(), kind.to_string());
}

fn wrap_xhtml(value: &str) -> Result<Element, xmltree::ParseError> {
    let wrapped = format!("<div xmlns=\"{XHTML}\">{value}</div>");
    xml::parse(wrapped.as_bytes())
}

/// Serialize the content of `wrapper`, omitting the wrapper itself.
fn inner_markup(wrapper: &Element) -> String {
    let mut out = String::new();
    for node in &wrapper.children {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &XMLNode, out: &mut String) {
    match node {
        XMLNode::Text(s) | XMLNode::CData(s) => out.push_str(&escape(s)),
        XMLNode::Element(e) => {
            out.push('<');
            out.push_str(&e.name);
            let mut attributes: Vec<_> = e.attributes.iter().collect();
            attributes.sort();
            for (k, v) in attributes {
                out.push(' ');
                out.push_str(k);
                out.push('=');
                out.push_str(&quote_attr(v));
            }
            out.push('>');
            for child in &e.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&e.name);
            out.push('>');
        }
        XMLNode::Comment(_) | XMLNode::ProcessingInstruction(..) => (),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Quote an attribute value, preferring double quotes and falling back to single quotes
/// when the value itself contains a double quote.
fn quote_attr(v: &str) -> String {
    let v = escape(v)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    match (v.contains('"'), v.contains('\'')) {
        (true, false) => format!("'{v}'"),
        (true, true) => format!("\"{}\"", v.replace('"', "&quot;")),
        _ => format!("\"{v}\""),
    }
}

/// The title of a service document node, following the text construct rules.
///
/// For `xhtml` titles this is the character data of the wrapping `div` and of each of
/// its children, without markup.
pub(crate) fn child_title(node: &Element) -> String {
    let Some(title) = xml::descendants(node, QName::atom("title")).into_iter().next() else {
        return String::new();
    };

    match title.attributes.get("type").map(String::as_str) {
        None | Some("text") | Some("html") => xml::text(title),
        _ => xml::descendants(title, QName::new(XHTML, "div"))
            .into_iter()
            .next()
            .map(|div| {
                div.children
                    .iter()
                    .map(|node| match node {
                        XMLNode::Text(s) | XMLNode::CData(s) => s.clone(),
                        XMLNode::Element(e) => xml::text(e),
                        _ => String::new(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}
