//! # xmlbind
//!
//! Declarative, version-aware mapping between XML documents and typed
//! element objects.
//!
//! Element types are declared as [`ElementSchema`] values: a qualified name
//! (optionally one per schema version) plus fields binding attributes and
//! child elements. The engine derives lookup rules from each declaration,
//! parses documents into [`XmlElement`] trees, and serializes them back.
//! Content a declaration does not mention is kept and written out again in
//! its original position, so parse-then-serialize is lossless.
//!
//! ## Features
//!
//! - Single and per-version qualified names for elements and attributes
//! - Single and repeated child-element fields
//! - Passthrough of unknown elements and attributes
//! - Text and tail content preserved for round-tripping
//! - UTF-8 and UTF-16 input (BOM and declaration aware) and output
//! - Query by local name / namespace across known and unknown children
//! - Schema catalogs loaded from JSON
//!
//! ## Example
//!
//! ```rust
//! use xmlbind::{ElementSchema, XmlElement};
//!
//! let inner = ElementSchema::builder("Inner")
//!     .qname("{http://example.com/xml/1}inner")
//!     .attribute("my_x", "x")
//!     .build()?;
//! let outer = ElementSchema::builder("Outer")
//!     .qname("{http://example.com/xml/1}outer")
//!     .repeated("innards", &inner)
//!     .build()?;
//!
//! let xml =
//!     r#"<outer xmlns="http://example.com/xml/1"><inner x="1"/><note/><inner x="2"/></outer>"#;
//! let parsed = XmlElement::from_string(xml, &outer, 1)?;
//! assert_eq!(parsed.children("innards").len(), 2);
//! assert_eq!(parsed.children("innards")[1].attribute("my_x"), Some("2"));
//! assert_eq!(parsed.to_xml_string(1)?, xml);
//! # Ok::<(), xmlbind::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and bytes
pub mod namespaces;
pub mod encoding;

// Materialized trees
pub mod documents;

// Declarations and derived rules
pub mod schema;
pub mod rules;
pub mod catalog;

// Instances
pub mod element;
pub mod parser;
pub mod serializer;

// Re-exports for convenience
pub use catalog::SchemaCatalog;
pub use element::{Child, ElementBuilder, FieldRef, FieldValue, XmlAttribute, XmlElement};
pub use encoding::Encoding;
pub use error::{Error, Result};
pub use limits::Limits;
pub use namespaces::{qname_matches, QName};
pub use parser::{parse, parse_with_limits};
pub use rules::{derive_rules, get_rules, ResolvedRules};
pub use schema::{ElementSchema, FieldSpec, QNameSpec, SchemaRef};
pub use serializer::serialize;

/// Version of the xmlbind library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
