//! Instance to XML conversion
//!
//! The serializer rebuilds a [`documents::Element`](crate::documents::Element)
//! tree from an instance and hands it to the writer. Children come out in the
//! instance's single ordered list, so recognized fields and passthrough
//! elements keep the relative order they were parsed in.
//!
//! Values are emitted as found: a scalar assigned to an element field becomes
//! a child element carrying that text, and an element assigned to an
//! attribute field is written as a child.

use crate::documents::Element;
use crate::element::{Child, XmlElement};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::rules::get_rules;

/// Build the XML tree for `element` at `version`
pub fn to_tree(element: &XmlElement, version: u32) -> Result<Element> {
    build(element, version, None)
}

/// Serialize `element` at `version` to bytes in `encoding`
pub fn serialize(element: &XmlElement, version: u32, encoding: Encoding) -> Result<Vec<u8>> {
    log::debug!(
        "serializing '{}' version {} as {}",
        element.schema().name(),
        version,
        encoding
    );
    to_tree(element, version)?.to_bytes(encoding)
}

fn build(element: &XmlElement, version: u32, fallback: Option<&QName>) -> Result<Element> {
    let schema = element.schema();
    let rules = get_rules(schema, version)?;
    let qname = element
        .qname()
        .or(rules.qname.as_ref())
        .or(fallback)
        .cloned()
        .ok_or_else(|| {
            Error::Schema(format!(
                "cannot serialize an element of schema '{}' without a qualified name",
                schema.name()
            ))
        })?;
    let mut node = Element::new(qname);

    for field in schema.fields().keys() {
        let Some(value) = element.values.get(field) else {
            continue;
        };
        if let Some(name) = rules.attribute_qname(field) {
            node.attributes.insert(name.clone(), value.clone());
        } else if let Some(name) = rules.element_qname(field) {
            let mut child = Element::new(name.clone());
            child.text = Some(value.clone());
            node.children.push(child);
        }
    }
    for (name, value) in &element.other_attributes {
        node.attributes.insert(name.clone(), value.clone());
    }

    for entry in &element.nodes {
        let child = match entry {
            Child::Field { slot, element } => build(element, version, rules.element_qname(slot))?,
            Child::Other(element) => build(element, version, None)?,
        };
        node.children.push(child);
    }

    node.text = element.text.clone();
    node.tail = element.tail.clone();
    Ok(node)
}

impl XmlElement {
    /// Build the XML tree for this element at `version`
    pub fn to_tree(&self, version: u32) -> Result<Element> {
        to_tree(self, version)
    }

    /// Serialize to a string, without XML declaration
    pub fn to_xml_string(&self, version: u32) -> Result<String> {
        to_tree(self, version)?.to_xml_string()
    }

    /// Serialize to bytes in `encoding`
    pub fn to_bytes(&self, version: u32, encoding: Encoding) -> Result<Vec<u8>> {
        serialize(self, version, encoding)
    }
}
