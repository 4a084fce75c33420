//! # XML Tree Helpers
//!
//! Thin helpers over [`xmltree`] for the handful of lookups the model needs: namespaced
//! child and descendant searches, `atom:link` relation lookup, and parsing/serializing
//! with a consistent configuration.
use std::fmt;
use std::io::Read;

use ::xml::attribute::OwnedAttribute;
use ::xml::name::OwnedName;
use ::xml::reader::{EventReader, ParserConfig, XmlEvent};
use xmltree::{Element, EmitterConfig, Namespace, ParseError, XMLNode};

/// The Atom Syndication Format namespace (RFC 4287).
pub const ATOM: &str = "http://www.w3.org/2005/Atom";
/// The Atom Publishing Protocol namespace (RFC 5023).
pub const APP: &str = "http://www.w3.org/2007/app";
/// The XHTML namespace, used by `xhtml` text constructs.
pub const XHTML: &str = "http://www.w3.org/1999/xhtml";

/// A namespace qualified element name.
///
/// Converting from a `&str` accepts either Clark notation (`{namespace}local`) or a bare
/// local name, which is placed in the Atom namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QName<'a> {
    pub ns: &'a str,
    pub local: &'a str,
}

impl<'a> QName<'a> {
    pub const fn new(ns: &'a str, local: &'a str) -> Self {
        QName { ns, local }
    }

    pub const fn atom(local: &'a str) -> Self {
        QName::new(ATOM, local)
    }

    pub const fn app(local: &'a str) -> Self {
        QName::new(APP, local)
    }

    pub fn matches(&self, element: &Element) -> bool {
        element.name == self.local && element.namespace.as_deref() == Some(self.ns)
    }
}

impl<'a> From<&'a str> for QName<'a> {
    fn from(s: &'a str) -> Self {
        s.strip_prefix('{')
            .and_then(|rest| rest.split_once('}'))
            .map(|(ns, local)| QName::new(ns, local))
            .unwrap_or_else(|| QName::atom(s))
    }
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.ns, self.local)
    }
}

/// Parse a complete document into its root element.
///
/// Whitespace between elements is kept as text, so inline markup such as
/// `<b>a</b> <i>b</i>` survives a round trip. CDATA sections read as text.
pub fn parse(bytes: &[u8]) -> Result<Element, ParseError> {
    let config = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(false);
    let mut reader = EventReader::new_with_config(bytes, config);

    let mut root = None;
    loop {
        match reader.next().map_err(ParseError::MalformedXml)? {
            XmlEvent::StartElement {
                name,
                attributes,
                namespace,
            } if root.is_none() => {
                let element = start_element(name, attributes, namespace);
                root = Some(build(&mut reader, element)?);
            }
            XmlEvent::EndDocument => return root.ok_or(ParseError::CannotParse),
            _ => (),
        }
    }
}

fn start_element(
    name: OwnedName,
    attributes: Vec<OwnedAttribute>,
    namespace: Namespace,
) -> Element {
    let mut element = Element::new(&name.local_name);
    element.prefix = name.prefix;
    element.namespace = name.namespace;
    element.namespaces = (!namespace.is_essentially_empty()).then_some(namespace);
    element.attributes = attributes
        .into_iter()
        .map(|a| (a.name.local_name, a.value))
        .collect();
    element
}

fn build<R: Read>(
    reader: &mut EventReader<R>,
    mut element: Element,
) -> Result<Element, ParseError> {
    loop {
        match reader.next().map_err(ParseError::MalformedXml)? {
            XmlEvent::EndElement { .. } => return Ok(element),
            XmlEvent::StartElement {
                name,
                attributes,
                namespace,
            } => {
                let child = start_element(name, attributes, namespace);
                element.children.push(XMLNode::Element(build(reader, child)?));
            }
            XmlEvent::Characters(s) | XmlEvent::CData(s) | XmlEvent::Whitespace(s) => {
                element.children.push(XMLNode::Text(s))
            }
            XmlEvent::Comment(s) => element.children.push(XMLNode::Comment(s)),
            XmlEvent::ProcessingInstruction { name, data } => element
                .children
                .push(XMLNode::ProcessingInstruction(name, data)),
            XmlEvent::StartDocument { .. } | XmlEvent::EndDocument => {
                return Err(ParseError::CannotParse)
            }
        }
    }
}

/// Serialize an element without an XML declaration.
pub fn serialize(element: &Element) -> Result<Vec<u8>, xmltree::Error> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(false)
        .perform_indent(false);
    element.write_with_config(&mut buf, config)?;
    Ok(buf)
}

pub(crate) fn as_element(node: &XMLNode) -> Option<&Element> {
    match node {
        XMLNode::Element(e) => Some(e),
        _ => None,
    }
}

/// Iterate over the direct child elements matching `name`.
pub fn children<'a>(
    element: &'a Element,
    name: QName<'a>,
) -> impl Iterator<Item = &'a Element> + 'a {
    element
        .children
        .iter()
        .filter_map(as_element)
        .filter(move |e| name.matches(e))
}

/// The first direct child element matching `name`.
pub fn child<'a>(element: &'a Element, name: QName<'a>) -> Option<&'a Element> {
    children(element, name).next()
}

/// All descendant elements matching `name`, in document order.
pub fn descendants<'a>(element: &'a Element, name: QName<'_>) -> Vec<&'a Element> {
    let mut found = Vec::new();
    collect_descendants(element, name, &mut found);
    found
}

fn collect_descendants<'a>(element: &'a Element, name: QName<'_>, found: &mut Vec<&'a Element>) {
    for child in element.children.iter().filter_map(as_element) {
        if name.matches(child) {
            found.push(child);
        }
        collect_descendants(child, name, found);
    }
}

/// The concatenated character data directly inside `element`.
pub fn text(element: &Element) -> String {
    element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(s) | XMLNode::CData(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

/// The `href` of the first `atom:link` child of `element` with the given relation.
pub fn link_value<'a>(element: &'a Element, relation: &str) -> Option<&'a str> {
    children(element, QName::atom("link"))
        .find(|link| link.attributes.get("rel").map(String::as_str) == Some(relation))
        .and_then(|link| link.attributes.get("href"))
        .map(String::as_str)
}

/// Create a new element named `name`, suitable for appending to `parent`.
///
/// The parent's prefix is reused when it shares the namespace, otherwise the new element
/// declares the namespace as its default.
pub fn new_child(parent: &Element, name: QName<'_>) -> Element {
    let mut element = Element::new(name.local);
    element.namespace = Some(name.ns.to_owned());
    if parent.namespace.as_deref() == Some(name.ns) {
        element.prefix = parent.prefix.clone();
    } else {
        let mut ns = Namespace::empty();
        ns.put("", name.ns);
        element.namespaces = Some(ns);
    }
    element
}
