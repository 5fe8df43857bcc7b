//! XML to instance conversion
//!
//! The parser materializes the whole document first (see
//! [`crate::documents`]) and then walks the tree, consulting the cached rules
//! of each node's schema. Content no rule claims is parsed with the generic
//! schema and kept in document order, so nothing is lost.

use crate::documents::{Document, Element};
use crate::element::{Child, XmlElement};
use crate::error::Result;
use crate::limits::Limits;
use crate::rules::get_rules;
use crate::schema::{ElementSchema, SchemaRef};

/// Parse a document into an instance of `schema`
pub fn parse(xml: &[u8], schema: &SchemaRef, version: u32) -> Result<XmlElement> {
    parse_with_limits(xml, schema, version, &Limits::default())
}

/// Parse a document into an instance of `schema`, enforcing `limits`
pub fn parse_with_limits(
    xml: &[u8],
    schema: &SchemaRef,
    version: u32,
    limits: &Limits,
) -> Result<XmlElement> {
    // Fail on an unusable version before doing any XML work.
    get_rules(schema, version)?;
    let document = Document::parse_with_limits(xml, limits)?;
    log::debug!(
        "parsing <{}> as '{}' version {}",
        document.root.qname,
        schema.name(),
        version
    );
    from_tree(document.into_root(), schema, version)
}

/// Convert an already materialized tree into an instance of `schema`
pub fn from_tree(tree: Element, schema: &SchemaRef, version: u32) -> Result<XmlElement> {
    let generic = ElementSchema::generic();
    harvest(tree, schema, &generic, version)
}

fn harvest(
    tree: Element,
    schema: &SchemaRef,
    generic: &SchemaRef,
    version: u32,
) -> Result<XmlElement> {
    let rules = get_rules(schema, version)?;
    let mut element = XmlElement::new(schema);

    for (name, value) in tree.attributes {
        match rules.attributes.get(&name) {
            Some(slot) => {
                element.values.insert(slot.clone(), value);
            }
            None => {
                log::trace!("keeping unmatched attribute '{}' on <{}>", name, tree.qname);
                element.other_attributes.insert(name, value);
            }
        }
    }

    for child in tree.children {
        match rules.elements.get(&child.qname) {
            Some(rule) => {
                let parsed = harvest(child, &rule.schema, generic, version)?;
                if rule.repeated {
                    element.nodes.push(Child::Field {
                        slot: rule.slot.clone(),
                        element: parsed,
                    });
                } else {
                    element.assign_parsed(&rule.slot, parsed);
                }
            }
            None => {
                log::trace!("keeping unmatched element <{}> under <{}>", child.qname, tree.qname);
                let parsed = harvest(child, generic, generic, version)?;
                element.nodes.push(Child::Other(parsed));
            }
        }
    }

    element.qname = Some(tree.qname);
    element.text = tree.text;
    element.tail = tree.tail;
    Ok(element)
}

impl XmlElement {
    /// Parse a document into an instance of `schema`
    pub fn from_bytes(xml: &[u8], schema: &SchemaRef, version: u32) -> Result<Self> {
        parse(xml, schema, version)
    }

    /// Parse a document held in a string
    pub fn from_string(xml: &str, schema: &SchemaRef, version: u32) -> Result<Self> {
        parse(xml.as_bytes(), schema, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::FieldRef;
    use crate::error::Error;
    use crate::namespaces::QName;
    use pretty_assertions::assert_eq;

    const SAMPLE_XML: &str = concat!(
        r#"<outer xmlns="http://example.com/xml/1" xmlns:two="http://example.com/xml/2">"#,
        r#"<inner x="123"/>"#,
        r#"<inner x="234" y="abc"/>"#,
        r#"<inner><two:nested>Some Test</two:nested><nested>Different Namespace</nested></inner>"#,
        r#"<other two:z="true"></other>"#,
        r#"</outer>"#
    );

    fn outer_schema() -> SchemaRef {
        let inner = ElementSchema::builder("Inner")
            .qname("{http://example.com/xml/1}inner")
            .attribute("my_x", "x")
            .build()
            .unwrap();
        ElementSchema::builder("Outer")
            .qname("{http://example.com/xml/1}outer")
            .repeated("innards", &inner)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_basic_xml_element() {
        let element = XmlElement::from_string(SAMPLE_XML, &ElementSchema::generic(), 1).unwrap();
        let inners = element.get_elements(Some("inner"), None, 1).unwrap();
        assert_eq!(inners.len(), 3);
        assert_eq!(inners[0].get_attributes(Some("x"), None, 1).unwrap()[0].value, "123");
        assert!(inners[0].get_attributes(Some("y"), None, 1).unwrap().is_empty());
        assert_eq!(inners[1].get_attributes(Some("x"), None, 1).unwrap()[0].value, "234");
        assert_eq!(inners[1].get_attributes(Some("y"), None, 1).unwrap()[0].value, "abc");
        assert!(inners[2].get_attributes(Some("x"), None, 1).unwrap().is_empty());

        let ns1 = Some("http://example.com/xml/1");
        assert_eq!(element.get_elements(Some("inner"), ns1, 1).unwrap().len(), 3);
        assert_eq!(element.get_elements(None, ns1, 1).unwrap().len(), 4);
        assert_eq!(element.get_elements(None, None, 1).unwrap().len(), 4);

        let others = element.get_elements(Some("other"), None, 1).unwrap();
        assert_eq!(others.len(), 1);
        let z = others[0]
            .get_attributes(Some("z"), Some("http://example.com/xml/2"), 1)
            .unwrap();
        assert_eq!(z[0].value, "true");
        assert!(element.get_elements(Some("missing"), None, 1).unwrap().is_empty());
    }

    #[test]
    fn test_schema_parse() {
        let outer = XmlElement::from_string(SAMPLE_XML, &outer_schema(), 1).unwrap();
        let innards = outer.children("innards");
        assert_eq!(innards.len(), 3);
        assert_eq!(innards[0].attribute("my_x"), Some("123"));
        assert_eq!(innards[1].attribute("my_x"), Some("234"));
        assert_eq!(
            innards[1].other_attributes.get(&QName::local("y")).map(String::as_str),
            Some("abc")
        );
        assert_eq!(innards[2].attribute("my_x"), None);
        assert_eq!(outer.other_elements().count(), 1);
        assert_eq!(
            outer.qname(),
            Some(&QName::namespaced("http://example.com/xml/1", "outer"))
        );
    }

    #[test]
    fn test_nested_unknown_content_is_kept() {
        let outer = XmlElement::from_string(SAMPLE_XML, &outer_schema(), 1).unwrap();
        let third = &outer.children("innards")[2];
        let nested: Vec<_> = third.other_elements().collect();
        assert_eq!(nested.len(), 2);
        assert_eq!(
            nested[0].qname(),
            Some(&QName::namespaced("http://example.com/xml/2", "nested"))
        );
        assert_eq!(nested[0].text.as_deref(), Some("Some Test"));
        assert_eq!(
            nested[1].qname(),
            Some(&QName::namespaced("http://example.com/xml/1", "nested"))
        );
        assert!(nested[0].schema().is_generic());
    }

    #[test]
    fn test_single_field_last_wins() {
        let title = ElementSchema::builder("Title").qname("title").build().unwrap();
        let entry = ElementSchema::builder("Entry")
            .qname("entry")
            .element("title", &title)
            .build()
            .unwrap();
        let xml = "<entry><title>first</title><x/><title>second</title></entry>";
        let parsed = XmlElement::from_string(xml, &entry, 1).unwrap();

        match parsed.value("title") {
            Some(FieldRef::Element(title)) => assert_eq!(title.text.as_deref(), Some("second")),
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(parsed.nodes().len(), 2);
        assert_eq!(parsed.nodes()[1].slot(), Some("title"));
    }

    #[test]
    fn test_text_and_tail_captured() {
        let parsed =
            XmlElement::from_string("<p>a<b>b</b>c</p>", &ElementSchema::generic(), 1).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("a"));
        let b = parsed.other_elements().next().unwrap();
        assert_eq!(b.text.as_deref(), Some("b"));
        assert_eq!(b.tail.as_deref(), Some("c"));
    }

    #[test]
    fn test_errors() {
        let schema = outer_schema();
        assert!(matches!(
            XmlElement::from_string("<outer><inner></outer>", &schema, 1),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            XmlElement::from_string(SAMPLE_XML, &schema, 0),
            Err(Error::Schema(_))
        ));
        let deep = "<a><a><a><a/></a></a></a>";
        assert!(matches!(
            parse_with_limits(deep.as_bytes(), &schema, 1, &Limits::new().with_max_depth(3)),
            Err(Error::LimitExceeded(_))
        ));
    }
}
