//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use nodex::{Database, DatabaseConfig, DocumentRef, IndexKind, IndexModuleConfig, Session};
use std::sync::{Arc, Once};
use tempfile::TempDir;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

pub const RDF_CONFIG: &str = r#"<collection xmlns="http://exist-db.org/collection-config/1.0">
    <index>
        <rdf>
        </rdf>
    </index>
</collection>"#;

pub const RDF_DOC: &str = r##"<?xml version="1.0"?>

<rdf:RDF xml:lang="en"
        xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">

<rdf:Description ID="biologicalParent">
  <rdf:type resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#Property"/>
</rdf:Description>

<rdf:Description ID="biologicalFather">
  <rdf:type resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#Property"/>
  <rdfs:subPropertyOf rdf:resource="#biologicalParent"/>
</rdf:Description>

</rdf:RDF>
"##;

pub const PROPERTY_QUERY: &str =
    "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> SELECT $x WHERE {$x a rdf:Property }";

pub const FULLTEXT_CONFIG: &str = r#"<collection xmlns="http://exist-db.org/collection-config/1.0">
    <index>
        <fulltext>
            <fieldType id="title" boost="2.0"/>
            <text qname="title" type="title"/>
            <text match="//p" field="para"
                  match-attr-name="rend" match-attr-value="important" match-attr-boost="4">
                <ignore qname="note"/>
                <inline qname="hi"/>
            </text>
        </fulltext>
    </index>
</collection>"#;

pub const BOOK: &str = r#"<book>
    <title>Ownership in Practice</title>
    <p rend="important">Ownership and borrowing</p>
    <p>Life<hi>times</hi> everywhere<note>margin scribble</note></p>
</book>"#;

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once per binary
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// ============================================================================
// TestDb - database in a temporary directory
// ============================================================================

pub struct TestDb {
    pub db: Arc<Database>,
    pub dir: TempDir,
}

impl TestDb {
    /// Database with both shipped engines and the default configuration
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = nodex::open(dir.path()).expect("Failed to open test database");
        TestDb { db, dir }
    }

    /// Database loading only the given engine
    pub fn with_engine(kind: IndexKind) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = DatabaseConfig {
            indexes: vec![IndexModuleConfig::new(kind)],
            ..DatabaseConfig::default()
        };
        let db = nodex::open_with_config(dir.path(), config).expect("Failed to open test database");
        TestDb { db, dir }
    }

    pub fn session(&self) -> Session {
        self.db.session()
    }

    /// Configure `collection` and store one document in it
    pub fn configure_and_store(
        &self,
        session: &Session,
        collection: &str,
        config: &str,
        name: &str,
        xml: &str,
    ) -> DocumentRef {
        let txn = session.begin();
        session
            .set_collection_config(&txn, collection, config)
            .expect("collection config rejected");
        session
            .store_document(&txn, collection, name, xml)
            .expect("document not stored")
    }
}
