//! Materialized XML document trees
//!
//! [`Document::parse`] decodes input bytes and builds an [`Element`] tree with
//! resolved namespaces, document-ordered children, and text/tail content.
//! [`Element::to_xml_string`] writes a tree back out. This is the only
//! module that talks to `quick-xml`.

use crate::encoding::{decode_document, Encoding};
use crate::error::{Error, Result, SyntaxError};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName, XML_NAMESPACE};
use indexmap::IndexMap;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, QName as RawName, ResolveResult};
use quick_xml::{NsReader, Writer};
use std::borrow::Cow;

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Element attributes in document order (namespace declarations excluded)
    pub attributes: IndexMap<QName, String>,
    /// Text before the first child (if any)
    pub text: Option<String>,
    /// Text after this element's end tag, up to the next sibling
    pub tail: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: IndexMap::new(),
            text: None,
            tail: None,
            children: Vec::new(),
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace()
    }

    /// Serialize this element (and its subtree) to a string.
    ///
    /// Each element is written unprefixed, redeclaring the default namespace
    /// where it changes; namespaced attributes get generated `nsN` prefixes
    /// declared on the element that first needs them. No XML declaration is
    /// written and the element's own tail is omitted.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        let mut next_prefix = 0usize;
        write_element(&mut writer, self, &NamespaceContext::new(), &mut next_prefix)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Serialize to bytes in the given encoding.
    ///
    /// UTF-8 output is the bare element. Other encodings are prefixed with a
    /// byte-order mark and an XML declaration naming the encoding.
    pub fn to_bytes(&self, encoding: Encoding) -> Result<Vec<u8>> {
        let body = self.to_xml_string()?;
        if encoding == Encoding::Utf8 {
            return Ok(body.into_bytes());
        }
        let mut out = encoding.bom().to_vec();
        out.extend(encoding.encode(&format!(
            "<?xml version='1.0' encoding='{}'?>",
            encoding.name()
        )));
        out.extend(encoding.encode(&body));
        Ok(out)
    }
}

/// XML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
    /// Encoding the input was decoded from
    pub encoding: Encoding,
}

impl Document {
    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        let root = parse_tree(xml, &Limits::default())?;
        Ok(Self {
            root,
            encoding: Encoding::Utf8,
        })
    }

    /// Parse an XML document from bytes with default limits
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from bytes, enforcing `limits`
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;
        let (text, encoding) = decode_document(xml)?;
        let root = parse_tree(&text, limits)?;
        Ok(Self { root, encoding })
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Take ownership of the root element
    pub fn into_root(self) -> Element {
        self.root
    }
}

/// Translate `\r\n` and lone `\r` to `\n`, as XML processors must before parsing
fn normalize_line_endings(xml: &str) -> Cow<'_, str> {
    if !xml.contains('\r') {
        return Cow::Borrowed(xml);
    }
    Cow::Owned(xml.replace("\r\n", "\n").replace('\r', "\n"))
}

fn parse_tree(xml: &str, limits: &Limits) -> Result<Element> {
    let xml = normalize_line_endings(xml);
    let mut reader = NsReader::from_str(&xml);
    let mut element_stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            SyntaxError::new("Malformed XML")
                .with_position(reader.buffer_position())
                .with_cause(e)
        })?;

        match event {
            Event::Start(e) => {
                limits.check_xml_depth(element_stack.len() + 1)?;
                let element = parse_element(&reader, &e, limits)?;
                element_stack.push(element);
            }
            Event::Empty(e) => {
                limits.check_xml_depth(element_stack.len() + 1)?;
                let element = parse_element(&reader, &e, limits)?;
                attach(&mut element_stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = element_stack.pop().ok_or_else(|| {
                    SyntaxError::new("Unexpected end tag").with_position(reader.buffer_position())
                })?;
                attach(&mut element_stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| {
                    SyntaxError::new("Failed to unescape text")
                        .with_position(reader.buffer_position())
                        .with_cause(e)
                })?;
                append_text(&mut element_stack, &text)?;
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|e| SyntaxError::new("Invalid CDATA section").with_cause(e))?;
                append_text(&mut element_stack, text)?;
            }
            Event::Eof => break,
            _ => {} // Declarations, comments, processing instructions, doctype
        }
        buf.clear();
    }

    if let Some(open) = element_stack.last() {
        return Err(SyntaxError::new(format!(
            "Unexpected end of document: element '{}' is not closed",
            open.qname
        ))
        .into());
    }
    root.ok_or_else(|| SyntaxError::new("Document has no root element").into())
}

/// Parse element from a start or empty-element tag
fn parse_element(reader: &NsReader<&[u8]>, start: &BytesStart, limits: &Limits) -> Result<Element> {
    let (resolved, local) = reader.resolve_element(start.name());
    let qname = QName::new(namespace_of(resolved)?, utf8(local.as_ref())?);
    let mut element = Element::new(qname);

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| {
            SyntaxError::new(format!("Failed to parse attribute of '{}'", element.qname))
                .with_cause(e)
        })?;

        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attr.key);
        let attr_qname = QName::new(namespace_of(resolved)?, utf8(local.as_ref())?);
        let attr_value = attribute_value(&attr.value)?;
        element.attributes.insert(attr_qname, attr_value);
    }
    limits.check_attributes(element.attributes.len())?;

    Ok(element)
}

/// Normalize a raw attribute value: literal whitespace becomes a space, then
/// references are expanded. `&#9;`, `&#10;` and `&#13;` survive as characters.
fn attribute_value(raw: &[u8]) -> Result<String> {
    let raw = utf8(raw)?;
    let spaced = raw.replace(|c: char| matches!(c, '\t' | '\n' | '\r'), " ");
    let value = unescape(&spaced)
        .map_err(|e| SyntaxError::new("Failed to unescape attribute value").with_cause(e))?;
    Ok(value.into_owned())
}

fn namespace_of(resolved: ResolveResult) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(utf8(ns)?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) if prefix == b"xml" => Ok(Some(XML_NAMESPACE.to_string())),
        ResolveResult::Unknown(prefix) => Err(SyntaxError::new(format!(
            "Unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))
        .into()),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| SyntaxError::new("Invalid UTF-8 in markup").with_cause(e).into())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(SyntaxError::new(format!(
            "Junk after document element: '{}'",
            element.qname
        ))
        .into());
    } else {
        *root = Some(element);
    }
    Ok(())
}

/// Route character data to the open element's text or its last child's tail
fn append_text(stack: &mut [Element], text: &str) -> Result<()> {
    let Some(current) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(SyntaxError::new("Text outside the document element").into());
    };
    let slot = match current.children.last_mut() {
        Some(child) => &mut child.tail,
        None => &mut current.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
    Ok(())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    parent_scope: &NamespaceContext,
    next_prefix: &mut usize,
) -> Result<()> {
    let mut scope = parent_scope.clone();
    let tag = element.local_name();
    let mut start = BytesStart::new(tag);

    let namespace = element.namespace();
    if namespace != scope.get_default_namespace() {
        start.push_attribute(("xmlns", namespace.unwrap_or("")));
        scope.set_default_namespace(namespace);
    }

    let mut attributes = Vec::with_capacity(element.attributes.len());
    for (name, value) in &element.attributes {
        let key = match name.namespace() {
            None => name.local_name.clone(),
            Some(uri) => {
                let prefix = match scope.prefix_for(uri) {
                    Some(prefix) => prefix.to_string(),
                    None => {
                        let prefix = format!("ns{}", *next_prefix);
                        *next_prefix += 1;
                        start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri));
                        scope.add_prefix(prefix.as_str(), uri);
                        prefix
                    }
                };
                format!("{}:{}", prefix, name.local_name)
            }
        };
        attributes.push((key, escape_attribute(value)));
    }
    for (key, value) in &attributes {
        start.push_attribute(Attribute {
            key: RawName(key.as_bytes()),
            value: Cow::Borrowed(value.as_bytes()),
        });
    }

    let has_text = element.text.as_deref().is_some_and(|t| !t.is_empty());
    if element.children.is_empty() && !has_text {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if let Some(text) = element.text.as_deref().filter(|t| !t.is_empty()) {
        write_text(writer, text)?;
    }
    for child in &element.children {
        write_element(writer, child, &scope, next_prefix)?;
        if let Some(tail) = child.tail.as_deref().filter(|t| !t.is_empty()) {
            write_text(writer, tail)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)
}

/// Escape an attribute value so whitespace other than spaces survives
/// attribute-value normalization on reparse
fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(|c: char| matches!(c, '\t' | '\n' | '\r')) {
        return escaped;
    }
    Cow::Owned(
        escaped
            .replace('\t', "&#9;")
            .replace('\n', "&#10;")
            .replace('\r', "&#13;"),
    )
}

/// Write character data; `\r` is written as a reference so line-ending
/// normalization on reparse leaves it intact
fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    let escaped = escape(text);
    let escaped = match escaped.contains('\r') {
        true => Cow::Owned(escaped.replace('\r', "&#13;")),
        false => escaped,
    };
    writer
        .write_event(Event::Text(BytesText::from_escaped(escaped)))
        .map_err(xml_error)
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::Xml(e.to_string())
}
