//! Element instances
//!
//! An [`XmlElement`] is one parsed or constructed element. Field values live
//! in two places: scalar values (attribute fields) keyed by field name, and a
//! single document-ordered list of [`Child`] entries holding both recognized
//! field children and passthrough elements the schema did not declare. Keeping
//! one list is what lets the serializer reproduce the original sibling order.

use crate::error::Result;
use crate::namespaces::{qname_matches, QName};
use crate::rules::get_rules;
use crate::schema::{ElementSchema, FieldSpec, SchemaRef};
use indexmap::IndexMap;

/// A value assigned to a declared field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Attribute (or text) value
    Text(String),
    /// A single child element
    Element(XmlElement),
    /// A sequence of child elements
    List(Vec<XmlElement>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<XmlElement> for FieldValue {
    fn from(value: XmlElement) -> Self {
        FieldValue::Element(value)
    }
}

impl From<Vec<XmlElement>> for FieldValue {
    fn from(value: Vec<XmlElement>) -> Self {
        FieldValue::List(value)
    }
}

/// Borrowed view of a field's current value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef<'a> {
    /// Nothing assigned
    Empty,
    /// Scalar value
    Text(&'a str),
    /// Single child element
    Element(&'a XmlElement),
    /// Repeated children, possibly empty
    List(Vec<&'a XmlElement>),
}

/// One entry of an element's ordered child list
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// A child bound to a declared field
    Field {
        /// Field name
        slot: String,
        /// The child
        element: XmlElement,
    },
    /// A child no rule matched, kept verbatim
    Other(XmlElement),
}

impl Child {
    /// The child element
    pub fn element(&self) -> &XmlElement {
        match self {
            Child::Field { element, .. } | Child::Other(element) => element,
        }
    }

    /// The field this child is bound to, if any
    pub fn slot(&self) -> Option<&str> {
        match self {
            Child::Field { slot, .. } => Some(slot),
            Child::Other(_) => None,
        }
    }

    fn element_mut(&mut self) -> &mut XmlElement {
        match self {
            Child::Field { element, .. } | Child::Other(element) => element,
        }
    }
}

/// An attribute returned by [`XmlElement::get_attributes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Attribute qualified name
    pub qname: QName,
    /// Attribute value
    pub value: String,
}

/// A parsed or constructed XML element
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub(crate) schema: SchemaRef,
    pub(crate) qname: Option<QName>,
    pub(crate) values: IndexMap<String, String>,
    pub(crate) nodes: Vec<Child>,
    /// Direct text content
    pub text: Option<String>,
    /// Text following this element's end tag
    pub tail: Option<String>,
    /// Attributes no rule matched
    pub other_attributes: IndexMap<QName, String>,
}

impl PartialEq for XmlElement {
    fn eq(&self, other: &Self) -> bool {
        self.schema.id() == other.schema.id()
            && self.qname == other.qname
            && self.values == other.values
            && self.nodes == other.nodes
            && self.text == other.text
            && self.tail == other.tail
            && self.other_attributes == other.other_attributes
    }
}

impl XmlElement {
    /// Create an empty instance of `schema`
    pub fn new(schema: &SchemaRef) -> Self {
        Self {
            schema: schema.clone(),
            qname: None,
            values: IndexMap::new(),
            nodes: Vec::new(),
            text: None,
            tail: None,
            other_attributes: IndexMap::new(),
        }
    }

    /// Create an instance of `schema` with text content
    pub fn with_text(schema: &SchemaRef, text: impl Into<String>) -> Self {
        let mut element = Self::new(schema);
        element.text = Some(text.into());
        element
    }

    /// Create a schema-less element with the given tag
    pub fn generic(qname: QName) -> Self {
        let mut element = Self::new(&ElementSchema::generic());
        element.qname = Some(qname);
        element
    }

    /// Start building an instance of `schema`
    pub fn builder(schema: &SchemaRef) -> ElementBuilder {
        ElementBuilder::new(schema)
    }

    /// Build an instance from text and `(field, value)` pairs.
    ///
    /// Pairs naming undeclared fields are dropped without error.
    pub fn from_fields<I, K, V>(schema: &SchemaRef, text: Option<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        let mut builder = ElementBuilder::new(schema);
        if let Some(text) = text {
            builder = builder.text(text);
        }
        builder.fields(fields).build()
    }

    /// The schema this instance was created from
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The element's own tag, if one was parsed or set
    pub fn qname(&self) -> Option<&QName> {
        self.qname.as_ref()
    }

    /// Override the element's tag
    pub fn set_qname(&mut self, qname: QName) {
        self.qname = Some(qname);
    }

    /// The tag used for `version`: the element's own, else the schema's
    pub fn tag(&self, version: u32) -> Result<Option<QName>> {
        match &self.qname {
            Some(qname) => Ok(Some(qname.clone())),
            None => Ok(self.schema.resolve_qname(version)?.cloned()),
        }
    }

    /// Check whether `field` is declared by the schema
    pub fn has_field(&self, field: &str) -> bool {
        self.schema.has_field(field)
    }

    /// Assign a field, replacing its previous value.
    ///
    /// Returns `false`, storing nothing, when the schema does not declare
    /// `field`. The value's shape is not checked against the declaration.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> bool {
        if !self.has_field(field) {
            log::trace!("ignoring undeclared field '{}' on '{}'", field, self.schema.name());
            return false;
        }
        match value.into() {
            FieldValue::Text(text) => {
                self.replace_children(field, Vec::new());
                self.values.insert(field.to_string(), text);
            }
            FieldValue::Element(element) => {
                self.values.shift_remove(field);
                self.replace_children(field, vec![element]);
            }
            FieldValue::List(elements) => {
                self.values.shift_remove(field);
                self.replace_children(field, elements);
            }
        }
        true
    }

    /// Clear a field
    pub fn clear(&mut self, field: &str) {
        self.values.shift_remove(field);
        self.nodes.retain(|node| node.slot() != Some(field));
    }

    /// Current value of a declared field; `None` if undeclared.
    ///
    /// Repeated fields always read as a list, possibly empty.
    pub fn value(&self, field: &str) -> Option<FieldRef<'_>> {
        let spec = self.schema.field(field)?;
        if let Some(text) = self.values.get(field) {
            return Some(FieldRef::Text(text));
        }
        Some(match spec {
            FieldSpec::Repeated(_) => FieldRef::List(self.children(field)),
            _ => self.child(field).map_or(FieldRef::Empty, FieldRef::Element),
        })
    }

    /// Scalar value of a field
    pub fn attribute(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Assign a scalar value to a field
    pub fn set_attribute(&mut self, field: &str, value: impl Into<String>) -> bool {
        self.set(field, FieldValue::Text(value.into()))
    }

    /// The child bound to a single-element field (the last, if several)
    pub fn child(&self, field: &str) -> Option<&XmlElement> {
        self.nodes.iter().rev().find_map(|node| match node {
            Child::Field { slot, element } if slot == field => Some(element),
            _ => None,
        })
    }

    /// Mutable access to the child bound to a single-element field
    pub fn child_mut(&mut self, field: &str) -> Option<&mut XmlElement> {
        self.nodes.iter_mut().rev().find_map(|node| match node {
            Child::Field { slot, element } if slot == field => Some(element),
            _ => None,
        })
    }

    /// Children bound to a field, in document order
    pub fn children(&self, field: &str) -> Vec<&XmlElement> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Child::Field { slot, element } if slot == field => Some(element),
                _ => None,
            })
            .collect()
    }

    /// Mutable children bound to a field, in document order
    pub fn children_mut(&mut self, field: &str) -> Vec<&mut XmlElement> {
        self.nodes
            .iter_mut()
            .filter_map(|node| match node {
                Child::Field { slot, element } if slot == field => Some(element),
                _ => None,
            })
            .collect()
    }

    /// Append a child to a field
    pub fn push_child(&mut self, field: &str, element: XmlElement) -> bool {
        if !self.has_field(field) {
            log::trace!("ignoring undeclared field '{}' on '{}'", field, self.schema.name());
            return false;
        }
        self.values.shift_remove(field);
        self.nodes.push(Child::Field {
            slot: field.to_string(),
            element,
        });
        true
    }

    /// Elements no rule matched, in document order
    pub fn other_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.nodes.iter().filter_map(|node| match node {
            Child::Other(element) => Some(element),
            Child::Field { .. } => None,
        })
    }

    /// Mutable access to the unmatched elements
    pub fn other_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.nodes.iter_mut().filter_map(|node| match node {
            Child::Other(element) => Some(element),
            Child::Field { .. } => None,
        })
    }

    /// Append a passthrough element
    pub fn push_other(&mut self, element: XmlElement) {
        self.nodes.push(Child::Other(element));
    }

    /// Every child, recognized or not, in document order
    pub fn nodes(&self) -> &[Child] {
        &self.nodes
    }

    /// Mutable access to every child, in document order
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.nodes.iter_mut().map(Child::element_mut)
    }

    /// Find child elements matching a local name and/or namespace.
    ///
    /// Field children are matched under the name their rule has for
    /// `version`, so a bare local name finds the per-version variant.
    /// Unmatched children are matched under their own tag. Results follow
    /// document order.
    pub fn get_elements(
        &self,
        local_name: Option<&str>,
        namespace: Option<&str>,
        version: u32,
    ) -> Result<Vec<&XmlElement>> {
        let rules = get_rules(&self.schema, version)?;
        let mut matches = Vec::new();
        for node in &self.nodes {
            let name = match node {
                Child::Field { slot, element } => match rules.element_qname(slot) {
                    Some(qname) => Some(qname.clone()),
                    None => element.tag(version)?,
                },
                Child::Other(element) => element.tag(version)?,
            };
            if qname_matches(local_name, namespace, name.as_ref()) {
                matches.push(node.element());
            }
        }
        Ok(matches)
    }

    /// Find attributes matching a local name and/or namespace.
    ///
    /// Declared attribute fields come first, under their name for `version`,
    /// then unmatched attributes.
    pub fn get_attributes(
        &self,
        local_name: Option<&str>,
        namespace: Option<&str>,
        version: u32,
    ) -> Result<Vec<XmlAttribute>> {
        let rules = get_rules(&self.schema, version)?;
        let declared = rules
            .attributes
            .iter()
            .filter_map(|(qname, slot)| self.values.get(slot).map(|value| (qname, value)));
        let matches = declared
            .chain(self.other_attributes.iter())
            .filter(|(qname, _)| qname.matches(local_name, namespace))
            .map(|(qname, value)| XmlAttribute {
                qname: qname.clone(),
                value: value.clone(),
            })
            .collect();
        Ok(matches)
    }

    /// Replace a field's children, keeping the position of the first one
    fn replace_children(&mut self, field: &str, elements: Vec<XmlElement>) {
        let position = self.nodes.iter().position(|node| node.slot() == Some(field));
        self.nodes.retain(|node| node.slot() != Some(field));
        let replacement = elements.into_iter().map(|element| Child::Field {
            slot: field.to_string(),
            element,
        });
        match position {
            Some(index) => {
                self.nodes.splice(index..index, replacement);
            }
            None => self.nodes.extend(replacement),
        }
    }

    /// Bind a parsed child to a single field; a later occurrence replaces
    /// an earlier one and takes its own document position
    pub(crate) fn assign_parsed(&mut self, field: &str, element: XmlElement) {
        self.nodes.retain(|node| node.slot() != Some(field));
        self.nodes.push(Child::Field {
            slot: field.to_string(),
            element,
        });
    }
}

/// Keyword-style construction of an [`XmlElement`].
///
/// Fields the schema does not declare are silently discarded.
#[derive(Debug, Clone)]
pub struct ElementBuilder {
    element: XmlElement,
}

impl ElementBuilder {
    /// Start building an instance of `schema`
    pub fn new(schema: &SchemaRef) -> Self {
        Self {
            element: XmlElement::new(schema),
        }
    }

    /// Set the text content
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.element.text = Some(text.into());
        self
    }

    /// Set an explicit tag
    pub fn qname(mut self, qname: QName) -> Self {
        self.element.qname = Some(qname);
        self
    }

    /// Assign one field
    pub fn field(mut self, field: impl AsRef<str>, value: impl Into<FieldValue>) -> Self {
        self.element.set(field.as_ref(), value);
        self
    }

    /// Assign several fields
    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        for (field, value) in fields {
            self.element.set(field.as_ref(), value);
        }
        self
    }

    /// Finish construction
    pub fn build(self) -> XmlElement {
        self.element
    }
}
