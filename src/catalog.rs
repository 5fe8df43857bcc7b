//! Schema catalogs: element schema declarations loaded from JSON
//!
//! A catalog maps schema names to declarations. Element fields refer to other
//! schemas by name; references are resolved when the catalog is loaded.
//!
//! # Example
//!
//! ```json
//! {
//!   "Child": { "qname": ["{http://example.com/1}child", "{http://example.com/2}child"] },
//!   "Foo": { "qname": "foo" },
//!   "Example": {
//!     "qname": "{http://example.com}foo",
//!     "fields": {
//!       "child": { "element": "Child" },
//!       "foos": { "repeated": "Foo" },
//!       "tag": { "attribute": "tag" },
//!       "versioned_attr": { "attribute": ["attr", "{http://new_ns}attr"] }
//!     }
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::schema::{ElementSchema, SchemaRef};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameDecl {
    Single(String),
    Versioned(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FieldDecl {
    Attribute(NameDecl),
    Element(String),
    Repeated(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDecl {
    #[serde(default)]
    qname: Option<NameDecl>,
    #[serde(default)]
    fields: IndexMap<String, FieldDecl>,
}

/// A named set of compiled schema declarations
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: IndexMap<String, SchemaRef>,
}

impl SchemaCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("loading schema catalog '{}'", path.display());
        Self::from_json_str(&content)
    }

    /// Load a catalog from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let decls: IndexMap<String, SchemaDecl> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        let mut visiting = Vec::new();
        for name in decls.keys() {
            catalog.compile(name, &decls, &mut visiting)?;
        }
        // Dependencies compile first; restore declaration order.
        catalog.schemas = decls
            .keys()
            .filter_map(|name| catalog.schemas.get(name).map(|s| (name.clone(), s.clone())))
            .collect();
        Ok(catalog)
    }

    /// Add an already built schema under `name`
    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaRef) {
        self.schemas.insert(name.into(), schema);
    }

    /// Look up a schema by name
    pub fn get(&self, name: &str) -> Option<&SchemaRef> {
        self.schemas.get(name)
    }

    /// Look up a schema by name, failing if it is missing
    pub fn require(&self, name: &str) -> Result<&SchemaRef> {
        self.get(name)
            .ok_or_else(|| Error::Schema(format!("no schema named '{}' in catalog", name)))
    }

    /// Schema names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Number of schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn compile(
        &mut self,
        name: &str,
        decls: &IndexMap<String, SchemaDecl>,
        visiting: &mut Vec<String>,
    ) -> Result<SchemaRef> {
        if let Some(schema) = self.schemas.get(name) {
            return Ok(schema.clone());
        }
        if visiting.iter().any(|v| v == name) {
            return Err(Error::Schema(format!(
                "schema reference cycle: {} -> {}",
                visiting.join(" -> "),
                name
            )));
        }
        let decl = decls
            .get(name)
            .ok_or_else(|| Error::Schema(format!("reference to unknown schema '{}'", name)))?;

        visiting.push(name.to_string());
        let mut builder = ElementSchema::builder(name);
        builder = match &decl.qname {
            None => builder,
            Some(NameDecl::Single(pattern)) => builder.qname(pattern),
            Some(NameDecl::Versioned(patterns)) => builder.versioned_qname(patterns),
        };
        for (field, spec) in &decl.fields {
            builder = match spec {
                FieldDecl::Attribute(NameDecl::Single(pattern)) => {
                    builder.attribute(field, pattern)
                }
                FieldDecl::Attribute(NameDecl::Versioned(patterns)) => {
                    builder.versioned_attribute(field, patterns)
                }
                FieldDecl::Element(target) => {
                    let target = self.compile(target, decls, visiting)?;
                    builder.element(field, &target)
                }
                FieldDecl::Repeated(target) => {
                    let target = self.compile(target, decls, visiting)?;
                    builder.repeated(field, &target)
                }
            };
        }
        visiting.pop();

        let schema = builder.build()?;
        self.schemas.insert(name.to_string(), schema.clone());
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::rules::get_rules;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EXAMPLE: &str = r#"{
        "Example": {
            "qname": "{http://example.com}foo",
            "fields": {
                "child": { "element": "Child" },
                "foos": { "repeated": "Foo" },
                "tag": { "attribute": "tag" },
                "versioned_attr": { "attribute": ["attr", "{http://new_ns}attr"] }
            }
        },
        "Child": { "qname": ["{http://example.com/1}child", "{http://example.com/2}child"] },
        "Foo": { "qname": "foo" }
    }"#;

    #[test]
    fn test_load_catalog() {
        let catalog = SchemaCatalog::from_json_str(EXAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);

        let example = catalog.require("Example").unwrap();
        let fields: Vec<_> = example.fields().keys().map(String::as_str).collect();
        assert_eq!(fields, ["child", "foos", "tag", "versioned_attr"]);

        let rules = get_rules(example, 2).unwrap();
        let child = &rules.elements[&QName::namespaced("http://example.com/2", "child")];
        assert_eq!(child.schema.id(), catalog.get("Child").unwrap().id());
        assert_eq!(rules.attributes[&QName::namespaced("http://new_ns", "attr")], "versioned_attr");
    }

    #[test]
    fn test_shared_references_compile_once() {
        let json = r#"{
            "A": { "qname": "a", "fields": { "x": { "element": "C" }, "y": { "repeated": "C" } } },
            "C": { "qname": "c" }
        }"#;
        let catalog = SchemaCatalog::from_json_str(json).unwrap();
        let a = catalog.require("A").unwrap();
        let rules = get_rules(a, 1).unwrap();
        // Both fields bind the same compiled schema; the later one wins the name.
        assert_eq!(rules.elements.len(), 1);
        assert_eq!(rules.elements[&QName::local("c")].slot, "y");
    }

    #[test]
    fn test_unknown_reference() {
        let json = r#"{ "A": { "qname": "a", "fields": { "x": { "element": "Missing" } } } }"#;
        let err = SchemaCatalog::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("unknown schema 'Missing'"));
    }

    #[test]
    fn test_reference_cycle() {
        let json = r#"{
            "A": { "qname": "a", "fields": { "b": { "element": "B" } } },
            "B": { "qname": "b", "fields": { "a": { "element": "A" } } }
        }"#;
        let err = SchemaCatalog::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("cycle"), "{}", err);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SchemaCatalog::from_json_str(r#"{ "A": { "qname": 5 } }"#),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            SchemaCatalog::from_json_str(r#"{ "A": { "fields": { "x": { "bogus": "y" } } } }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let catalog = SchemaCatalog::from_file(file.path()).unwrap();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names, ["Example", "Child", "Foo"]);
        assert!(catalog.require("Nope").is_err());
    }
}
