//! Minimal element tree built from quick-xml events.
//!
//! Feeds are small enough to hold in memory, and a tree lets the parser look up
//! fields by name instead of tracking element state across events. Common HTML
//! entities that XML does not define (`&nbsp;` outside CDATA is frequent) are
//! resolved alongside the predefined ones; other unknown entities are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Maximum element nesting accepted before the document is rejected.
const MAX_DEPTH: usize = 256;

/// Named entities accepted in text: XML's predefined five, then HTML ones
/// feeds use without declaring them. `nbsp` becomes a plain space.
const TEXT_ENTITIES: [(&str, &str); 16] = [
    ("lt", "<"),
    ("gt", ">"),
    ("amp", "&"),
    ("apos", "'"),
    ("quot", "\""),
    ("nbsp", " "),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("hellip", "\u{2026}"),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
];

fn resolve_entity(name: &str) -> Option<&'static str> {
    let resolved = TEXT_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|(_, text)| *text);
    if resolved.is_none() {
        tracing::debug!(entity = %name, "Dropping unknown entity");
    }
    Some(resolved.unwrap_or(""))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    /// Qualified name as written, e.g. `itunes:image`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attr in start.attributes().with_checks(false) {
            let attr = match attr {
                Ok(attr) => attr,
                Err(e) => {
                    tracing::debug!(element = %name, error = %e, "Skipping malformed attribute");
                    continue;
                }
            };
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.decode_and_unescape_value(reader.decoder()) {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            attributes.push((key, value));
        }

        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First direct child element with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// All descendant text concatenated, like the DOM `textContent`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Depth-first search for the first element with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in self.elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

/// Parses a document into a synthetic root element holding the top-level nodes.
///
/// Elements still open at end of input are closed implicitly.
pub(crate) fn parse_document(content: &str) -> Result<Element, String> {
    // Text is not trimmed: whitespace between inline elements is content
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.len() > MAX_DEPTH {
                    return Err(format!("nesting deeper than {MAX_DEPTH} levels"));
                }
                stack.push(Element::from_start(&e, &reader));
            }
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e, &reader);
                push_child(&mut stack, Node::Element(element));
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    if let Some(done) = stack.pop() {
                        push_child(&mut stack, Node::Element(done));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let raw = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|e| e.to_string())?
                    .into_owned();
                // Only a stray `&` without `;` fails here; keep such text as written
                let text = match quick_xml::escape::unescape_with(&raw, resolve_entity) {
                    Ok(unescaped) => unescaped.into_owned(),
                    Err(_) => raw.clone(),
                };
                push_child(&mut stack, Node::Text(text));
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|e| e.to_string())?
                    .into_owned();
                push_child(&mut stack, Node::Text(text));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            Ok(_) => {}
        }
    }

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            push_child(&mut stack, Node::Element(open));
        }
    }

    stack.pop().ok_or_else(|| "empty document".to_string())
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}
