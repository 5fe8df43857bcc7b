//! Parsing and serialization rules derived from schema declarations
//!
//! [`derive_rules`] turns an [`ElementSchema`] and a version into lookup
//! tables keyed by qualified name. [`get_rules`] memoizes the result per
//! (schema identity, version) for the life of the process; entries are
//! immutable and shared.

use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::schema::{ElementSchema, FieldSpec, SchemaId, SchemaRef};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type RuleCache = HashMap<(SchemaId, u32), Arc<ResolvedRules>>;

static RULES: Lazy<RwLock<RuleCache>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// How a child element name maps onto a field
#[derive(Debug, Clone)]
pub struct ElementRule {
    /// Field receiving the parsed child
    pub slot: String,
    /// Schema the child is parsed with
    pub schema: SchemaRef,
    /// Whether the field collects every occurrence
    pub repeated: bool,
}

impl PartialEq for ElementRule {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
            && self.repeated == other.repeated
            && self.schema.id() == other.schema.id()
    }
}

impl Eq for ElementRule {}

/// Rules for one schema at one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRules {
    /// Tag for the version; `None` for the schema-less element
    pub qname: Option<QName>,
    /// Child qualified name to element rule, in field declaration order
    pub elements: IndexMap<QName, ElementRule>,
    /// Attribute qualified name to field name, in field declaration order
    pub attributes: IndexMap<QName, String>,
}

impl ResolvedRules {
    /// Qualified name a child-element field is matched under
    pub fn element_qname(&self, slot: &str) -> Option<&QName> {
        self.elements
            .iter()
            .find(|(_, rule)| rule.slot == slot)
            .map(|(qname, _)| qname)
    }

    /// Qualified name an attribute field is written under
    pub fn attribute_qname(&self, slot: &str) -> Option<&QName> {
        self.attributes
            .iter()
            .find(|(_, field)| field.as_str() == slot)
            .map(|(qname, _)| qname)
    }
}

/// Derive the rules for `schema` at `version` without consulting the cache.
pub fn derive_rules(schema: &ElementSchema, version: u32) -> Result<ResolvedRules> {
    let qname = schema.resolve_qname(version)?.cloned();
    let mut elements = IndexMap::new();
    let mut attributes = IndexMap::new();

    for (field, spec) in schema.fields() {
        match spec {
            FieldSpec::Attribute(names) => {
                let what = format!("attribute field '{}' of schema '{}'", field, schema.name());
                if let Some(name) = names.resolve(version, &what)? {
                    attributes.insert(name.clone(), field.clone());
                }
            }
            FieldSpec::Element(child) | FieldSpec::Repeated(child) => {
                let name = child.resolve_qname(version)?.cloned().ok_or_else(|| {
                    Error::Schema(format!(
                        "field '{}' of schema '{}' binds schema '{}', which has no qualified name",
                        field,
                        schema.name(),
                        child.name()
                    ))
                })?;
                let rule = ElementRule {
                    slot: field.clone(),
                    schema: child.clone(),
                    repeated: matches!(spec, FieldSpec::Repeated(_)),
                };
                elements.insert(name, rule);
            }
        }
    }

    Ok(ResolvedRules {
        qname,
        elements,
        attributes,
    })
}

/// Get the cached rules for `schema` at `version`, deriving them on first use.
///
/// Repeated calls return the same `Arc`. Derivation happens outside the
/// lock; if two threads race, the first published value wins.
pub fn get_rules(schema: &ElementSchema, version: u32) -> Result<Arc<ResolvedRules>> {
    let key = (schema.id(), version);
    {
        let cache = RULES.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(rules) = cache.get(&key) {
            return Ok(rules.clone());
        }
    }

    log::debug!("deriving rules for schema '{}' version {}", schema.name(), version);
    let derived = Arc::new(derive_rules(schema, version)?);

    let mut cache = RULES.write().unwrap_or_else(PoisonError::into_inner);
    Ok(cache.entry(key).or_insert(derived).clone())
}
