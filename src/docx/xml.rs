//! Owned XML tree with full round-trip fidelity.
//!
//! quick-xml's pull parser is fast but borrow-heavy; document surgery
//! (moving rows around, splicing runs) is much simpler on an owned tree, and
//! the documents involved are a few hundred kilobytes at most. Parsing keeps
//! text and attribute values unescaped in memory and re-escapes on write, so
//! a parse/serialize cycle never corrupts content.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::DocxError;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

/// One element with its attributes and children, in document order.
///
/// Names keep their namespace prefix verbatim (`w:tbl`); matching helpers
/// compare local names so templates with unusual prefixes still work.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// Name without its namespace prefix: `w:tbl` -> `tbl`.
pub fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    /// True when the local names match, prefixes aside.
    pub fn is_named(&self, name: &str) -> bool {
        local_name(&self.name) == local_name(name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn push_element(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.child_elements().filter(move |el| el.is_named(name))
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.child_elements_mut().filter(move |el| el.is_named(name))
    }

    // Not routed through `children_named`: that would tie the returned
    // reference to the lifetime of `name`.
    pub fn first_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.is_named(name))
    }

    pub fn first_child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.child_elements_mut().find(|el| el.is_named(name))
    }

    /// Concatenated text of this element's direct text and CDATA nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
                _ => {}
            }
        }
        out
    }
}

/// Parses a complete XML part and returns its root element.
pub fn parse(xml: &[u8]) -> Result<XmlElement, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let (name, attrs) = owned_start(&reader, &e)?;
                return read_element(&mut reader, name, attrs);
            }
            Event::Empty(e) => {
                let (name, attrs) = owned_start(&reader, &e)?;
                return Ok(XmlElement {
                    name,
                    attrs,
                    children: Vec::new(),
                });
            }
            Event::Eof => return Err(DocxError::Malformed("no root element".to_string())),
            // Declaration, comments and whitespace before the root element.
            _ => {}
        }
        buf.clear();
    }
}

/// Serializes a tree back to bytes, with the XML declaration Word expects.
pub fn serialize(root: &XmlElement) -> Result<Vec<u8>, DocxError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn owned_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<(String, Vec<(String, String)>), DocxError> {
    let name = String::from_utf8(start.name().as_ref().to_vec())?;
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        let value = attr.decode_and_unescape_value(reader.decoder())?.into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

fn read_element(
    reader: &mut Reader<&[u8]>,
    name: String,
    attrs: Vec<(String, String)>,
) -> Result<XmlElement, DocxError> {
    let mut element = XmlElement {
        name,
        attrs,
        children: Vec::new(),
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let (name, attrs) = owned_start(reader, &e)?;
                let child = read_element(reader, name, attrs)?;
                element.children.push(XmlNode::Element(child));
            }
            Event::Empty(e) => {
                let (name, attrs) = owned_start(reader, &e)?;
                element.children.push(XmlNode::Element(XmlElement {
                    name,
                    attrs,
                    children: Vec::new(),
                }));
            }
            Event::Text(e) => {
                let raw = String::from_utf8(e.as_ref().to_vec())?;
                let text =
                    unescape(&raw).map_err(|err| DocxError::Malformed(err.to_string()))?;
                push_text(&mut element, &text);
            }
            Event::GeneralRef(e) => {
                if let Some(resolved) = resolve_reference(&e.into_inner()) {
                    push_text(&mut element, &resolved);
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8(e.into_inner().into_owned())?;
                element.children.push(XmlNode::CData(text));
            }
            Event::Comment(e) => {
                let text = String::from_utf8(e.into_inner().into_owned())?;
                element.children.push(XmlNode::Comment(text));
            }
            Event::End(_) => return Ok(element),
            Event::Eof => {
                return Err(DocxError::Malformed(format!(
                    "element {} is never closed",
                    element.name
                )))
            }
            // Processing instructions and doctype nodes never occur in
            // WordprocessingML parts.
            _ => {}
        }
        buf.clear();
    }
}

fn push_text(element: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(last)) = element.children.last_mut() {
        last.push_str(text);
    } else {
        element.children.push(XmlNode::Text(text.to_string()));
    }
}

/// Resolves the predefined XML entities and numeric character references.
/// Custom entities need a DTD, which OOXML parts never carry.
fn resolve_reference(name: &[u8]) -> Option<String> {
    match name {
        b"amp" => Some("&".to_string()),
        b"lt" => Some("<".to_string()),
        b"gt" => Some(">".to_string()),
        b"apos" => Some("'".to_string()),
        b"quot" => Some("\"".to_string()),
        _ => {
            let name = std::str::from_utf8(name).ok()?;
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value).map(String::from)
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), DocxError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(el) => write_element(writer, el)?,
            XmlNode::Text(text) => {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            XmlNode::CData(text) => {
                writer.write_event(Event::CData(BytesCData::new(text.as_str())))?;
            }
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
