//! In-memory XML tree for the appcast, with namespace-aware parsing and
//! serialization.
//!
//! Names are stored as `(namespace URI, local name)` pairs. Prefixes only
//! exist at the edges: the reader resolves them away and the writer picks
//! them again from [`Namespaces`].

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;

use crate::error::AppcastError;

pub const SPARKLE_PREFIX: &str = "sparkle";
pub const SPARKLE_NS: &str = "http://www.andymatuschak.org/xml-namespaces/sparkle";

const XML_PREFIX: &str = "xml";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

// ---------------------------------------------------------------------------
// Names and namespaces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
  pub namespace: Option<String>,
  pub local: String,
}

impl Name {
  pub fn local(local: impl Into<String>) -> Self {
    Self {
      namespace: None,
      local: local.into(),
    }
  }

  pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
    Self {
      namespace: Some(namespace.into()),
      local: local.into(),
    }
  }

  pub fn sparkle(local: impl Into<String>) -> Self {
    Self::qualified(SPARKLE_NS, local)
  }
}

/// Prefix bindings used when writing. `sparkle` is always registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
  bindings: Vec<(String, String)>,
}

impl Default for Namespaces {
  fn default() -> Self {
    let mut namespaces = Self {
      bindings: Vec::new(),
    };
    namespaces.register(SPARKLE_PREFIX, SPARKLE_NS);
    namespaces
  }
}

impl Namespaces {
  /// Bind `prefix` to `uri`, replacing any existing binding of either.
  pub fn register(&mut self, prefix: &str, uri: &str) {
    self.bindings.retain(|(p, u)| p != prefix && u != uri);
    self.bindings.push((prefix.to_string(), uri.to_string()));
  }

  /// Record a binding found in a document unless it conflicts with a registered one.
  fn declare(&mut self, prefix: &str, uri: &str) {
    if self.prefix_for(uri).is_none() && self.uri_for(prefix).is_none() {
      self.bindings.push((prefix.to_string(), uri.to_string()));
    }
  }

  pub fn prefix_for(&self, uri: &str) -> Option<&str> {
    if uri == XML_NS {
      return Some(XML_PREFIX);
    }
    self
      .bindings
      .iter()
      .find(|(_, u)| u == uri)
      .map(|(p, _)| p.as_str())
  }

  pub fn uri_for(&self, prefix: &str) -> Option<&str> {
    self
      .bindings
      .iter()
      .find(|(p, _)| p == prefix)
      .map(|(_, u)| u.as_str())
  }

  /// Turn a raw `prefix:local` string into a [`Name`]. Unknown prefixes are
  /// kept as part of the local name.
  pub fn resolve_raw(&self, raw: &str) -> Name {
    match raw.split_once(':') {
      Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => match self.uri_for(prefix) {
        Some(uri) => Name::qualified(uri, local),
        None => Name::local(raw),
      },
      _ => Name::local(raw),
    }
  }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Element(Element),
  Text(String),
  CData(String),
  Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
  pub name: Name,
  pub attributes: Vec<(Name, String)>,
  pub children: Vec<Node>,
}

impl Element {
  pub fn new(name: Name) -> Self {
    Self {
      name,
      attributes: Vec::new(),
      children: Vec::new(),
    }
  }

  /// Element holding a single text node.
  pub fn with_text(name: Name, text: impl Into<String>) -> Self {
    let mut element = Self::new(name);
    element.children.push(Node::Text(text.into()));
    element
  }

  pub fn attribute(&self, name: &Name) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }

  /// Set an attribute, overwriting an existing value in place.
  pub fn set_attribute(&mut self, name: Name, value: impl Into<String>) {
    let value = value.into();
    match self.attributes.iter_mut().find(|(n, _)| *n == name) {
      Some(slot) => slot.1 = value,
      None => self.attributes.push((name, value)),
    }
  }

  pub fn elements(&self) -> impl Iterator<Item = &Element> {
    self.children.iter().filter_map(|node| match node {
      Node::Element(el) => Some(el),
      _ => None,
    })
  }

  pub fn children_named<'a>(&'a self, name: &'a Name) -> impl Iterator<Item = &'a Element> {
    self.elements().filter(move |el| el.name == *name)
  }

  /// First child element with the given name.
  pub fn child(&self, name: &Name) -> Option<&Element> {
    self.elements().find(|el| el.name == *name)
  }

  pub fn child_mut(&mut self, name: &Name) -> Option<&mut Element> {
    self.children.iter_mut().find_map(|node| match node {
      Node::Element(el) if el.name == *name => Some(el),
      _ => None,
    })
  }

  /// Concatenated text and CDATA directly under this element.
  pub fn text(&self) -> String {
    let mut out = String::new();
    for node in &self.children {
      match node {
        Node::Text(t) | Node::CData(t) => out.push_str(t),
        _ => {}
      }
    }
    out
  }

  pub fn push(&mut self, child: Element) {
    self.children.push(Node::Element(child));
  }

  /// Keep only child elements accepted by `keep`. A whitespace-only text
  /// node directly after a dropped element goes with it.
  pub fn retain_elements<F>(&mut self, mut keep: F)
  where
    F: FnMut(&Element) -> bool,
  {
    let mut kept = Vec::with_capacity(self.children.len());
    let mut after_dropped = false;
    for node in std::mem::take(&mut self.children) {
      match node {
        Node::Element(el) => {
          after_dropped = !keep(&el);
          if !after_dropped {
            kept.push(Node::Element(el));
          }
        }
        Node::Text(t) if after_dropped && t.trim().is_empty() => {
          after_dropped = false;
        }
        other => {
          after_dropped = false;
          kept.push(other);
        }
      }
    }
    self.children = kept;
  }
}

// ---------------------------------------------------------------------------
// Document: parse + serialize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  pub root: Element,
  pub namespaces: Namespaces,
}

impl Document {
  pub fn parse(input: &str) -> Result<Self, AppcastError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = NsReader::from_str(input);
    let mut namespaces = Namespaces::default();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
      match reader.read_event()? {
        Event::Start(start) => {
          stack.push(open_element(&reader, &start, &mut namespaces)?);
        }
        Event::Empty(start) => {
          let element = open_element(&reader, &start, &mut namespaces)?;
          close_element(&mut stack, &mut root, element)?;
        }
        Event::End(_) => {
          let element = stack
            .pop()
            .ok_or_else(|| AppcastError::feed("unexpected end tag"))?;
          close_element(&mut stack, &mut root, element)?;
        }
        Event::Text(text) => {
          let text = text.unescape()?.into_owned();
          match stack.last_mut() {
            Some(parent) => parent.children.push(Node::Text(text)),
            None if text.trim().is_empty() => {}
            None => return Err(AppcastError::feed("text outside the root element")),
          }
        }
        Event::CData(cdata) => {
          let text = utf8(&cdata.into_inner())?;
          if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::CData(text));
          }
        }
        Event::Comment(comment) => {
          let text = utf8(&comment.into_inner())?;
          if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::Comment(text));
          }
        }
        Event::Eof => break,
        _ => {}
      }
    }

    if !stack.is_empty() {
      return Err(AppcastError::feed("unclosed element at end of document"));
    }
    let root = root.ok_or_else(|| AppcastError::feed("document has no root element"))?;
    Ok(Self { root, namespaces })
  }

  /// Serialize with an XML declaration. Every namespace in use is declared on the root.
  pub fn to_xml(&self) -> String {
    let mut prefixes = self.namespaces.clone();
    let mut used = Vec::new();
    collect_namespaces(&self.root, &mut used);

    let mut generated = 0;
    let mut declarations = Vec::new();
    for uri in used {
      if uri == XML_NS {
        continue;
      }
      let existing = prefixes.prefix_for(&uri).map(str::to_string);
      let prefix = match existing {
        Some(prefix) => prefix,
        None => {
          let prefix = loop {
            let candidate = format!("ns{}", generated);
            generated += 1;
            if prefixes.uri_for(&candidate).is_none() {
              break candidate;
            }
          };
          prefixes.register(&prefix, &uri);
          prefix
        }
      };
      declarations.push((prefix, uri));
    }
    declarations.sort();

    let mut out = String::from("<?xml version='1.0' encoding='utf-8'?>\n");
    write_element(&mut out, &self.root, &prefixes, &declarations);
    out
  }
}

fn open_element(
  reader: &NsReader<&[u8]>,
  start: &BytesStart,
  namespaces: &mut Namespaces,
) -> Result<Element, AppcastError> {
  let (resolved, local) = reader.resolve_element(start.name());
  let mut element = Element::new(Name {
    namespace: namespace_of(resolved)?,
    local: utf8(local.as_ref())?,
  });

  for attr in start.attributes() {
    let attr = attr.map_err(quick_xml::Error::from)?;
    let value = attr.unescape_value()?.into_owned();
    match attr.key.as_namespace_binding() {
      Some(PrefixDeclaration::Named(prefix)) => namespaces.declare(&utf8(prefix)?, &value),
      Some(PrefixDeclaration::Default) => namespaces.declare("", &value),
      None => {
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let name = Name {
          namespace: namespace_of(resolved)?,
          local: utf8(local.as_ref())?,
        };
        element.set_attribute(name, value);
      }
    }
  }

  Ok(element)
}

fn close_element(
  stack: &mut [Element],
  root: &mut Option<Element>,
  element: Element,
) -> Result<(), AppcastError> {
  match stack.last_mut() {
    Some(parent) => parent.push(element),
    None if root.is_none() => *root = Some(element),
    None => return Err(AppcastError::feed("multiple root elements")),
  }
  Ok(())
}

fn namespace_of(resolved: ResolveResult) -> Result<Option<String>, AppcastError> {
  match resolved {
    ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref())?)),
    ResolveResult::Unbound => Ok(None),
    ResolveResult::Unknown(prefix) => Err(AppcastError::feed(format!(
      "unbound namespace prefix {:?}",
      String::from_utf8_lossy(&prefix)
    ))),
  }
}

fn utf8(bytes: &[u8]) -> Result<String, AppcastError> {
  std::str::from_utf8(bytes)
    .map(str::to_string)
    .map_err(|e| AppcastError::feed(format!("invalid utf-8: {}", e)))
}

fn collect_namespaces(element: &Element, used: &mut Vec<String>) {
  let names = std::iter::once(&element.name).chain(element.attributes.iter().map(|(n, _)| n));
  for name in names {
    if let Some(ns) = &name.namespace {
      if !used.contains(ns) {
        used.push(ns.clone());
      }
    }
  }
  for child in element.elements() {
    collect_namespaces(child, used);
  }
}

fn qualified_name(name: &Name, prefixes: &Namespaces) -> String {
  match name
    .namespace
    .as_deref()
    .and_then(|ns| prefixes.prefix_for(ns))
  {
    Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name.local),
    _ => name.local.clone(),
  }
}

fn write_element(
  out: &mut String,
  element: &Element,
  prefixes: &Namespaces,
  declarations: &[(String, String)],
) {
  let tag = qualified_name(&element.name, prefixes);
  out.push('<');
  out.push_str(&tag);

  for (prefix, uri) in declarations {
    if prefix.is_empty() {
      out.push_str(" xmlns=\"");
    } else {
      out.push_str(" xmlns:");
      out.push_str(prefix);
      out.push_str("=\"");
    }
    out.push_str(&escape(uri.as_str()));
    out.push('"');
  }

  for (name, value) in &element.attributes {
    out.push(' ');
    out.push_str(&qualified_name(name, prefixes));
    out.push_str("=\"");
    out.push_str(&escape(value.as_str()));
    out.push('"');
  }

  if element.children.is_empty() {
    out.push_str(" />");
    return;
  }
  out.push('>');

  for child in &element.children {
    match child {
      Node::Element(el) => write_element(out, el, prefixes, &[]),
      Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
      Node::CData(text) => {
        out.push_str("<![CDATA[");
        out.push_str(text);
        out.push_str("]]>");
      }
      Node::Comment(text) => {
        out.push_str("<!--");
        out.push_str(text);
        out.push_str("-->");
      }
    }
  }

  out.push_str("</");
  out.push_str(&tag);
  out.push('>');
}
