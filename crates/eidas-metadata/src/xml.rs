//! Hardened XML element tree.
//!
//! Partner documents (metadata, requests, responses) are untrusted. They are
//! parsed into a small owned tree with these guarantees:
//!
//! - input above a caller-supplied size is refused before any parsing;
//! - a DOCTYPE declaration aborts the parse, so no entity expansion or
//!   external DTD lookup can ever happen;
//! - undeclared entity references, unbalanced tags and duplicate attributes
//!   are parse errors;
//! - elements nested deeper than [`MAX_DEPTH`] are refused;
//! - exactly one root element is accepted.
//!
//! Elements and attributes are looked up by local name; namespace prefixes
//! are preserved for serialization but not interpreted.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// XML parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The input exceeds the configured size limit.
    #[error("document of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Size of the input.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The input nests elements deeper than [`MAX_DEPTH`].
    #[error("document nests elements deeper than {limit} levels")]
    TooDeep {
        /// Maximum accepted depth.
        limit: usize,
    },

    /// The input is not UTF-8.
    #[error("document is not valid UTF-8")]
    NotUtf8,

    /// The input declares a document type.
    #[error("DOCTYPE declarations are not allowed")]
    DoctypeForbidden,

    /// The input is not well-formed.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// The input has more than one top-level element.
    #[error("document has more than one root element")]
    MultipleRoots,

    /// The input has no element at all.
    #[error("document has no root element")]
    NoRoot,
}

/// Deepest element nesting accepted by [`parse`].
///
/// SAML protocol messages and metadata stay well below twenty levels.
pub const MAX_DEPTH: usize = 128;

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data (already unescaped).
    Text(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

fn local_part(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

fn is_namespace_declaration(qualified: &str) -> bool {
    qualified == "xmlns" || qualified.starts_with("xmlns:")
}

impl Element {
    /// Creates an empty element with a (possibly prefixed) name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the qualified name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Returns whether the element's local name is `local`.
    #[must_use]
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Returns the value of the attribute whose local name is `local`.
    ///
    /// Namespace declarations are never matched.
    #[must_use]
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| !is_namespace_declaration(name) && local_part(name) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over attributes as `(qualified name, value)`.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Sets an attribute, replacing a previous value with the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Adds an attribute when `value` is present.
    #[must_use]
    pub fn with_opt_attr(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_attr(name, value),
            None => self,
        }
    }

    /// Appends a child element.
    pub fn push_child(&mut self, child: Self) {
        self.children.push(Node::Element(child));
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.push_child(child);
        self
    }

    /// Appends every element of `children`.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        for child in children {
            self.push_child(child);
        }
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Iterates over all child nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Iterates over child elements.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Iterates over child elements with local name `local`.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children().filter(move |child| child.is(local))
    }

    /// Returns the first child element with local name `local`.
    #[must_use]
    pub fn child(&self, local: &str) -> Option<&Self> {
        self.children().find(|child| child.is(local))
    }

    /// Follows a chain of child local names from this element.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&Self> {
        path.iter()
            .try_fold(self, |current, local| current.child(local))
    }

    /// Collects every descendant (not including `self`) with local name
    /// `local`, in document order.
    #[must_use]
    pub fn descendants_named(&self, local: &str) -> Vec<&Self> {
        let mut found = Vec::new();
        self.collect_descendants(local, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, local: &str, found: &mut Vec<&'a Self>) {
        for child in self.children() {
            if child.is(local) {
                found.push(child);
            }
            child.collect_descendants(local, found);
        }
    }

    /// Returns the concatenated direct text content, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(value) = node {
                text.push_str(value);
            }
        }
        text.trim().to_string()
    }

    /// Returns the text of the first child named `local`.
    #[must_use]
    pub fn child_text(&self, local: &str) -> Option<String> {
        self.child(local).map(Self::text)
    }

    /// Removes every child element with local name `local`.
    ///
    /// Returns the number of elements removed.
    pub fn remove_children(&mut self, local: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(element) if element.is(local)));
        before - self.children.len()
    }

    /// Serializes the element and its subtree.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(element) => element.write_into(out),
                Node::Text(text) => out.push_str(&escape(text.as_str())),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|_| XmlError::NotUtf8)?
        .to_string();

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|_| XmlError::NotUtf8)?;
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Malformed(e.to_string()))?;
        element
            .attributes
            .push((key.to_string(), value.into_owned()));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn check_depth(stack: &[Element]) -> Result<(), XmlError> {
    if stack.len() >= MAX_DEPTH {
        return Err(XmlError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlError::Malformed("text outside the root element".into())),
    }
}

/// Parses an untrusted document into an element tree.
///
/// # Errors
///
/// Returns an [`XmlError`] if the input is too large, not UTF-8, declares a
/// DOCTYPE, is malformed or does not have exactly one root element.
pub fn parse(input: &[u8], max_size: usize) -> Result<Element, XmlError> {
    if input.len() > max_size {
        return Err(XmlError::TooLarge {
            size: input.len(),
            limit: max_size,
        });
    }
    let text = std::str::from_utf8(input).map_err(|_| XmlError::NotUtf8)?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::DocType(_)) => return Err(XmlError::DoctypeForbidden),
            Ok(Event::Start(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::MultipleRoots);
                }
                check_depth(&stack)?;
                stack.push(element_from(&start)?);
            }
            Ok(Event::Empty(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::MultipleRoots);
                }
                check_depth(&stack)?;
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Malformed("unexpected closing tag".into()))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(raw)) => {
                let value = raw
                    .unescape()
                    .map_err(|e| XmlError::Malformed(e.to_string()))?;
                push_text(&mut stack, value.into_owned())?;
            }
            Ok(Event::CData(raw)) => {
                let value = String::from_utf8(raw.into_inner().into_owned())
                    .map_err(|_| XmlError::NotUtf8)?;
                push_text(&mut stack, value)?;
            }
            Ok(Event::Eof) => break,
            // declarations, comments and processing instructions
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Malformed("unclosed element at end of document".into()));
    }
    root.ok_or(XmlError::NoRoot)
}

/// Parses an `xs:dateTime` value.
///
/// Values without a zone designator are read as UTC.
#[must_use]
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|instant| instant.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Formats an instant as an `xs:dateTime` in UTC with millisecond precision.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
