//! CLI integration tests
//!
//! These tests run the built binary against documents and catalogs written
//! to temporary directories.

#![cfg(feature = "cli")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SAMPLE_XML: &str = concat!(
    r#"<outer xmlns="http://example.com/xml/1" xmlns:two="http://example.com/xml/2">"#,
    r#"<inner x="123"/>"#,
    r#"<inner x="234" y="abc"/>"#,
    r#"<inner><two:nested>Some Test</two:nested></inner>"#,
    r#"<other two:z="true">note</other>"#,
    r#"</outer>"#
);

const CATALOG: &str = r#"{
    "Outer": {
        "qname": "{http://example.com/xml/1}outer",
        "fields": { "innards": { "repeated": "Inner" } }
    },
    "Inner": {
        "qname": "{http://example.com/xml/1}inner",
        "fields": { "my_x": { "attribute": "x" } }
    },
    "Example": {
        "qname": "{http://example.com}foo",
        "fields": {
            "child": { "element": "Child" },
            "versioned_attr": { "attribute": ["attr", "{http://new_ns}attr"] }
        }
    },
    "Child": { "qname": ["{http://example.com/1}child", "{http://example.com/2}child"] }
}"#;

fn xmlbind_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xmlbind"))
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("sample.xml"), SAMPLE_XML).unwrap();
        fs::write(dir.path().join("catalog.json"), CATALOG).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn arg(&self, name: &str) -> String {
        self.path(name).to_str().unwrap().to_string()
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(xmlbind_bin())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn read_utf8(path: &Path) -> String {
    fs::read_to_string(path).expect("output file should be UTF-8")
}

// ============================================================================
// Roundtrip Command Tests
// ============================================================================

#[test]
fn test_cli_roundtrip_generic() {
    let fx = Fixture::new();
    let output = run(&["roundtrip", &fx.arg("sample.xml")]);

    assert!(output.status.success(), "roundtrip should succeed");
    let expected = concat!(
        r#"<outer xmlns="http://example.com/xml/1">"#,
        r#"<inner x="123"/>"#,
        r#"<inner x="234" y="abc"/>"#,
        r#"<inner><nested xmlns="http://example.com/xml/2">Some Test</nested></inner>"#,
        r#"<other xmlns:ns0="http://example.com/xml/2" ns0:z="true">note</other>"#,
        r#"</outer>"#
    );
    assert_eq!(stdout(&output).trim_end(), expected);
}

#[test]
fn test_cli_roundtrip_with_catalog_to_file() {
    let fx = Fixture::new();
    let out = fx.path("out.xml");
    let output = run(&[
        "roundtrip",
        &fx.arg("sample.xml"),
        "--catalog",
        &fx.arg("catalog.json"),
        "--root",
        "Outer",
        "--output",
        out.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "roundtrip with catalog should succeed");
    let written = read_utf8(&out);
    let a = roxmltree::Document::parse(SAMPLE_XML).unwrap();
    let b = roxmltree::Document::parse(&written).unwrap();
    let names = |d: &roxmltree::Document| -> Vec<String> {
        d.descendants()
            .filter(|n| n.is_element())
            .map(|n| format!("{:?}:{}", n.tag_name().namespace(), n.tag_name().name()))
            .collect()
    };
    assert_eq!(names(&a), names(&b));
}

#[test]
fn test_cli_roundtrip_utf16() {
    let fx = Fixture::new();
    let out = fx.path("out16.xml");
    let output = run(&[
        "roundtrip",
        &fx.arg("sample.xml"),
        "--encoding",
        "utf-16be",
        "--output",
        out.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "utf-16 roundtrip should succeed");
    let bytes = fs::read(&out).unwrap();
    assert_eq!(&bytes[..2], &[0xFE, 0xFF]);

    // Feed the UTF-16 output back in and compare with the UTF-8 rendering.
    let again = run(&["roundtrip", out.to_str().unwrap()]);
    assert!(again.status.success());
    let direct = run(&["roundtrip", &fx.arg("sample.xml")]);
    assert_eq!(stdout(&again), stdout(&direct));
}

#[test]
fn test_cli_roundtrip_bad_encoding() {
    let fx = Fixture::new();
    let output = run(&["roundtrip", &fx.arg("sample.xml"), "--encoding", "latin-1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_cli_roundtrip_malformed_input() {
    let fx = Fixture::new();
    fs::write(fx.path("bad.xml"), "<a><b></a>").unwrap();
    let output = run(&["roundtrip", &fx.arg("bad.xml")]);
    assert!(!output.status.success(), "malformed XML should fail");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

// ============================================================================
// Query Command Tests
// ============================================================================

#[test]
fn test_cli_query_by_tag() {
    let fx = Fixture::new();
    let output = run(&["query", &fx.arg("sample.xml"), "--tag", "inner"]);

    assert!(output.status.success(), "query should succeed");
    let out = stdout(&output);
    assert!(out.contains("{http://example.com/xml/1}inner"));
    assert!(out.contains("3 match(es)"));
}

#[test]
fn test_cli_query_by_namespace_with_text() {
    let fx = Fixture::new();
    let output = run(&[
        "query",
        &fx.arg("sample.xml"),
        "--namespace",
        "http://example.com/xml/1",
        "--catalog",
        &fx.arg("catalog.json"),
        "--root",
        "Outer",
    ]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("{http://example.com/xml/1}other\tnote"));
    assert!(out.contains("4 match(es)"));
}

#[test]
fn test_cli_query_no_matches() {
    let fx = Fixture::new();
    let output = run(&["query", &fx.arg("sample.xml"), "--tag", "missing"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("0 match(es)"));
}

// ============================================================================
// Rules Command Tests
// ============================================================================

#[test]
fn test_cli_rules_json() {
    let fx = Fixture::new();
    let output = run(&[
        "rules",
        "--catalog",
        &fx.arg("catalog.json"),
        "--root",
        "Example",
        "--version",
        "2",
    ]);

    assert!(output.status.success(), "rules should succeed");
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
    assert_eq!(json["schema"], "Example");
    assert_eq!(json["version"], 2);
    assert_eq!(json["qname"], "{http://example.com}foo");
    assert_eq!(json["elements"]["{http://example.com/2}child"]["slot"], "child");
    assert_eq!(json["elements"]["{http://example.com/2}child"]["schema"], "Child");
    assert_eq!(json["elements"]["{http://example.com/2}child"]["repeated"], false);
    assert_eq!(json["attributes"]["{http://new_ns}attr"], "versioned_attr");
}

#[test]
fn test_cli_rules_version_out_of_range() {
    let fx = Fixture::new();
    let output = run(&[
        "rules",
        "--catalog",
        &fx.arg("catalog.json"),
        "--root",
        "Example",
        "--version",
        "3",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("version"));
}

#[test]
fn test_cli_rules_unknown_root() {
    let fx = Fixture::new();
    let output = run(&["rules", "--catalog", &fx.arg("catalog.json"), "--root", "Nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Nope"));
}
