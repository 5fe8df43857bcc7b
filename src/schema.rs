//! Element schema declarations
//!
//! An [`ElementSchema`] describes one kind of XML element: its qualified
//! name (optionally different per schema version) and the fields that bind
//! its attributes and child elements. Declarations are plain values built
//! with [`SchemaBuilder`] and shared as [`SchemaRef`].
//!
//! ```rust
//! use xmlbind::schema::ElementSchema;
//!
//! let child = ElementSchema::builder("Child")
//!     .versioned_qname(["{http://example.com/1}child", "{http://example.com/2}child"])
//!     .build()?;
//! let example = ElementSchema::builder("Example")
//!     .qname("{http://example.com}foo")
//!     .element("child", &child)
//!     .attribute("tag", "tag")
//!     .versioned_attribute("versioned_attr", ["attr", "{http://new_ns}attr"])
//!     .build()?;
//! assert!(example.has_field("child"));
//! # Ok::<(), xmlbind::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::namespaces::QName;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared handle to a schema declaration
pub type SchemaRef = Arc<ElementSchema>;

/// Process-unique identity of a built schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u64);

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

static GENERIC: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(ElementSchema {
        id: SchemaId(0),
        name: "XmlElement".to_string(),
        qname: QNameSpec::Any,
        fields: IndexMap::new(),
    })
});

/// A qualified name that may vary by schema version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QNameSpec {
    /// No declared name; the element takes whatever tag it is given
    Any,
    /// The same name for every version
    Single(QName),
    /// One name per version, index 0 being version 1
    Versioned(Vec<QName>),
}

impl QNameSpec {
    /// Resolve the name for a 1-based version
    ///
    /// `what` names the declaration in error messages.
    pub fn resolve(&self, version: u32, what: &str) -> Result<Option<&QName>> {
        if version == 0 {
            return Err(Error::Schema(format!(
                "version out of range: versions start at 1 ({})",
                what
            )));
        }
        match self {
            QNameSpec::Any => Ok(None),
            QNameSpec::Single(qname) => Ok(Some(qname)),
            QNameSpec::Versioned(variants) => variants
                .get(version as usize - 1)
                .map(Some)
                .ok_or_else(|| Error::version_out_of_range(what, version, variants.len())),
        }
    }

    fn single(pattern: &str) -> Result<Self> {
        Ok(QNameSpec::Single(QName::from_clark(pattern)?))
    }

    fn versioned<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let variants = patterns
            .into_iter()
            .map(|p| QName::from_clark(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if variants.is_empty() {
            return Err(Error::Schema("versioned name declares no variants".to_string()));
        }
        Ok(QNameSpec::Versioned(variants))
    }
}

/// How a field binds to the XML
#[derive(Debug, Clone)]
pub enum FieldSpec {
    /// An attribute, possibly named differently per version
    Attribute(QNameSpec),
    /// A single child element
    Element(SchemaRef),
    /// Zero or more child elements, in document order
    Repeated(SchemaRef),
}

impl FieldSpec {
    /// Whether this field binds child elements
    pub fn is_element(&self) -> bool {
        !matches!(self, FieldSpec::Attribute(_))
    }
}

/// Declaration of one element type
#[derive(Debug)]
pub struct ElementSchema {
    id: SchemaId,
    name: String,
    qname: QNameSpec,
    fields: IndexMap<String, FieldSpec>,
}

impl ElementSchema {
    /// Start declaring a schema; `name` is used in logs and errors
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// The schema-less element: no name, no fields
    pub fn generic() -> SchemaRef {
        GENERIC.clone()
    }

    /// Identity used to key derived rules
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// Declaration name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared qualified name(s)
    pub fn qname(&self) -> &QNameSpec {
        &self.qname
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Check whether a field is declared
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Resolve this schema's qualified name for a version
    pub fn resolve_qname(&self, version: u32) -> Result<Option<&QName>> {
        self.qname.resolve(version, &format!("schema '{}'", self.name))
    }

    /// Whether this is the schema-less element
    pub fn is_generic(&self) -> bool {
        self.id == SchemaId(0)
    }
}

/// Builder for [`ElementSchema`].
///
/// Pattern errors are collected and reported by [`SchemaBuilder::build`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    qname: Result<QNameSpec>,
    fields: IndexMap<String, Result<FieldSpec>>,
}

impl SchemaBuilder {
    /// Create a builder with no qualified name and no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qname: Ok(QNameSpec::Any),
            fields: IndexMap::new(),
        }
    }

    /// Set a version-independent qualified name (`local` or `{uri}local`)
    pub fn qname(mut self, pattern: &str) -> Self {
        self.qname = QNameSpec::single(pattern);
        self
    }

    /// Set per-version qualified names, version 1 first
    pub fn versioned_qname<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.qname = QNameSpec::versioned(patterns);
        self
    }

    /// Bind an attribute to `field`
    pub fn attribute(mut self, field: impl Into<String>, pattern: &str) -> Self {
        let spec = QNameSpec::single(pattern).map(FieldSpec::Attribute);
        self.fields.insert(field.into(), spec);
        self
    }

    /// Bind an attribute whose name differs per version
    pub fn versioned_attribute<I, S>(mut self, field: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let spec = QNameSpec::versioned(patterns).map(FieldSpec::Attribute);
        self.fields.insert(field.into(), spec);
        self
    }

    /// Bind a single child element
    pub fn element(mut self, field: impl Into<String>, schema: &SchemaRef) -> Self {
        self.fields
            .insert(field.into(), Ok(FieldSpec::Element(schema.clone())));
        self
    }

    /// Bind a repeated child element
    pub fn repeated(mut self, field: impl Into<String>, schema: &SchemaRef) -> Self {
        self.fields
            .insert(field.into(), Ok(FieldSpec::Repeated(schema.clone())));
        self
    }

    /// Add an already-constructed field spec
    pub fn field(mut self, field: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(field.into(), Ok(spec));
        self
    }

    /// Finish the declaration
    pub fn build(self) -> Result<SchemaRef> {
        let name = self.name;
        let qname = self
            .qname
            .map_err(|e| Error::Schema(format!("schema '{}': {}", name, e)))?;
        let fields = self
            .fields
            .into_iter()
            .map(|(field, spec)| {
                spec.map(|spec| (field.clone(), spec)).map_err(|e| {
                    Error::Schema(format!("schema '{}', field '{}': {}", name, field, e))
                })
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(Arc::new(ElementSchema {
            id: SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed)),
            name,
            qname,
            fields,
        }))
    }
}
