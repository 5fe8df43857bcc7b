//! XML namespace handling
//!
//! This module provides qualified names in clark notation (`{uri}local`),
//! the qualified-name matcher used by the query API, and the namespace
//! context the writer uses to assign prefixes.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// XML namespace, always bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName; an empty namespace is the same as no namespace
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()).filter(|ns| !ns.is_empty()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self::new(Some(namespace), local_name)
    }

    /// Parse clark notation: `local` or `{uri}local`
    ///
    /// `{uri}` with an empty local name is accepted; it is the
    /// namespace-only pattern used by wildcard queries.
    pub fn from_clark(clark: &str) -> Result<Self> {
        match clark.strip_prefix('{') {
            Some(rest) => {
                let (namespace, local) = rest.split_once('}').ok_or_else(|| {
                    Error::Name(format!("Unterminated namespace in qualified name: '{}'", clark))
                })?;
                Ok(Self::new(Some(namespace), local))
            }
            None => Ok(Self::local(clark)),
        }
    }

    /// Get the namespace as a string slice
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check whether a `(local name, namespace)` query selects this name
    pub fn matches(&self, local_name: Option<&str>, namespace: Option<&str>) -> bool {
        qname_matches(local_name, namespace, Some(self))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

impl FromStr for QName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_clark(s)
    }
}

/// Decide whether a query selects a member qualified name.
///
/// `local_name` and `namespace` are the query; `pattern` is the member's
/// name. `None` in the query is a wildcard, `Some("")` as namespace requires
/// the member to have no namespace. A missing pattern matches everything.
pub fn qname_matches(
    local_name: Option<&str>,
    namespace: Option<&str>,
    pattern: Option<&QName>,
) -> bool {
    let pattern = match pattern {
        Some(pattern) => pattern,
        None => return true,
    };
    let member_local = pattern.local_name.as_str();
    let member_ns = pattern.namespace();

    let local_ok = match local_name {
        None => true,
        Some(local) => local == member_local,
    };
    let ns_ok = match namespace {
        None => true,
        Some("") => member_ns.is_none(),
        Some(ns) => member_ns == Some(ns),
    };
    local_ok && ns_ok
}

/// Namespace context for assigning prefixes while writing
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    /// Mapping from namespace URI to prefix
    prefixes: HashMap<NamespaceUri, Prefix>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(namespace.into(), prefix.into());
    }

    /// Set the default namespace; `None` undeclares it
    pub fn set_default_namespace(&mut self, namespace: Option<&str>) {
        self.default_namespace = namespace.map(str::to_string);
    }

    /// Get the prefix in scope for a namespace
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        if namespace == XML_NAMESPACE {
            return Some("xml");
        }
        self.prefixes.get(namespace).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(clark: &str) -> QName {
        QName::from_clark(clark).unwrap()
    }

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
        assert_eq!(QName::namespaced("", "element"), QName::local("element"));
    }

    #[test]
    fn test_qname_clark_round_trip() {
        assert_eq!(q("{http://example.com}element").to_string(), "{http://example.com}element");
        assert_eq!(q("element").to_string(), "element");
        assert_eq!(q("{http://example.com}").local_name, "");
        assert!(QName::from_clark("{http://example.com").is_err());
    }

    #[test]
    fn test_match_qnames() {
        let m = |local: Option<&str>, ns: Option<&str>, pattern: &str| {
            qname_matches(local, ns, Some(&q(pattern)))
        };
        assert!(m(Some("foo"), Some("http://example.com"), "{http://example.com}foo"));
        assert!(m(None, None, "{http://example.com}foo"));
        assert!(m(None, None, "foo"));
        assert!(qname_matches(None, None, None));
        assert!(m(None, None, "{http://example.com}"));
        assert!(m(Some("foo"), None, "{http://example.com}foo"));
        assert!(m(None, Some("http://example.com"), "{http://example.com}foo"));
        assert!(m(None, Some(""), "foo"));
        assert!(m(Some("foo"), Some(""), "foo"));

        assert!(!m(Some("foo"), Some("http://google.com"), "{http://example.com}foo"));
        assert!(!m(Some("foo"), Some("http://example.com"), "{http://example.com}bar"));
        assert!(!m(Some("foo"), Some("http://example.com"), "{http://google.com}foo"));
        assert!(!m(Some("bar"), Some("http://example.com"), "{http://google.com}foo"));
        assert!(!m(Some("foo"), None, "{http://example.com}bar"));
        assert!(!m(None, Some("http://google.com"), "{http://example.com}foo"));
        assert!(!m(None, Some(""), "{http://example.com}foo"));
        assert!(!m(Some("foo"), Some(""), "bar"));
    }

    #[test]
    fn test_unqualified_pattern_with_explicit_namespace() {
        assert!(!qname_matches(Some("foo"), Some("http://x"), Some(&q("foo"))));
        assert!(q("foo").matches(Some("foo"), None));
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("ns0", "http://example.com/2");
        ctx.set_default_namespace(Some("http://example.com"));

        assert_eq!(ctx.prefix_for("http://example.com/2"), Some("ns0"));
        assert_eq!(ctx.prefix_for(XML_NAMESPACE), Some("xml"));
        assert_eq!(ctx.prefix_for("http://unknown"), None);
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));

        ctx.set_default_namespace(None);
        assert_eq!(ctx.get_default_namespace(), None);
    }
}
