//! Command-line interface for xmlbind

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlbind::{Encoding, ElementSchema, SchemaCatalog, SchemaRef, XmlElement};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlbind")]
#[command(author, version, long_about = None)]
#[command(about = "Parse, query and re-serialize XML through element schemas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a document and serialize it again
    Roundtrip {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON schema catalog
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Catalog schema for the root element (generic if omitted)
        #[arg(short, long, requires = "catalog")]
        root: Option<String>,

        /// Schema version
        #[arg(short, long, default_value_t = 1)]
        version: u32,

        /// Output encoding: utf-8, utf-16le, utf-16be
        #[arg(short, long, default_value = "utf-8")]
        encoding: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List child elements of the root matching a name
    Query {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Local name to match
        #[arg(short, long)]
        tag: Option<String>,

        /// Namespace to match ("" for no namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// JSON schema catalog
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Catalog schema for the root element (generic if omitted)
        #[arg(short, long, requires = "catalog")]
        root: Option<String>,

        /// Schema version
        #[arg(short, long, default_value_t = 1)]
        version: u32,
    },

    /// Print the rules derived for a catalog schema as JSON
    Rules {
        /// JSON schema catalog
        #[arg(short, long)]
        catalog: PathBuf,

        /// Schema name
        #[arg(short, long)]
        root: String,

        /// Schema version
        #[arg(short, long, default_value_t = 1)]
        version: u32,
    },
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roundtrip {
            file,
            catalog,
            root,
            version,
            encoding,
            output,
        } => cmd_roundtrip(file, catalog, root, version, encoding, output),
        Commands::Query {
            file,
            tag,
            namespace,
            catalog,
            root,
            version,
        } => cmd_query(file, tag, namespace, catalog, root, version),
        Commands::Rules {
            catalog,
            root,
            version,
        } => cmd_rules(catalog, root, version),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn load_schema(
    catalog: Option<PathBuf>,
    root: Option<String>,
) -> Result<SchemaRef, Box<dyn std::error::Error>> {
    match (catalog, root) {
        (Some(catalog), Some(root)) => {
            let catalog = SchemaCatalog::from_file(&catalog)?;
            Ok(catalog.require(&root)?.clone())
        }
        _ => Ok(ElementSchema::generic()),
    }
}

#[cfg(feature = "cli")]
fn cmd_roundtrip(
    file: PathBuf,
    catalog: Option<PathBuf>,
    root: Option<String>,
    version: u32,
    encoding: String,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(catalog, root)?;
    let encoding: Encoding = encoding.parse()?;
    let content = fs::read(&file)?;

    let element = XmlElement::from_bytes(&content, &schema, version)?;
    let bytes = element.to_bytes(version, encoding)?;

    match output {
        Some(path) => fs::write(path, bytes)?,
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            stdout.write_all(&bytes)?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_query(
    file: PathBuf,
    tag: Option<String>,
    namespace: Option<String>,
    catalog: Option<PathBuf>,
    root: Option<String>,
    version: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(catalog, root)?;
    let content = fs::read(&file)?;
    let element = XmlElement::from_bytes(&content, &schema, version)?;

    let matches = element.get_elements(tag.as_deref(), namespace.as_deref(), version)?;
    for child in &matches {
        let name = child
            .tag(version)?
            .map(|q| q.to_string())
            .unwrap_or_else(|| "(unnamed)".to_string());
        match child.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => println!("{}\t{}", name, text),
            None => println!("{}", name),
        }
    }
    println!("{} match(es)", matches.len());

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_rules(
    catalog: PathBuf,
    root: String,
    version: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::{json, Map, Value};

    let catalog = SchemaCatalog::from_file(&catalog)?;
    let schema = catalog.require(&root)?;
    let rules = xmlbind::get_rules(schema, version)?;

    let mut elements = Map::new();
    for (qname, rule) in &rules.elements {
        elements.insert(
            qname.to_string(),
            json!({
                "slot": rule.slot,
                "schema": rule.schema.name(),
                "repeated": rule.repeated,
            }),
        );
    }
    let mut attributes = Map::new();
    for (qname, slot) in &rules.attributes {
        attributes.insert(qname.to_string(), Value::String(slot.clone()));
    }

    let output = json!({
        "schema": schema.name(),
        "version": version,
        "qname": rules.qname.as_ref().map(|q| q.to_string()),
        "elements": elements,
        "attributes": attributes,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
