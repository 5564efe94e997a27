//! Collection configuration and `nodex.toml`

use crate::common::*;
use nodex::{DatabaseConfig, Error, Index, IndexKind, IndexModuleConfig};

#[test]
fn default_config_loads_both_engines() {
    let test_db = TestDb::new();
    let kinds: Vec<IndexKind> = test_db
        .db
        .indexes()
        .indexes()
        .iter()
        .map(|i| i.kind())
        .collect();
    assert_eq!(kinds, vec![IndexKind::FullText, IndexKind::Rdf]);
    assert!(test_db.dir.path().join("nodex.toml").exists());
}

#[test]
fn invalid_rule_rejects_whole_configuration() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let txn = session.begin();

    let no_target = r#"<collection><index><fulltext><text field="x"/></fulltext></index></collection>"#;
    assert!(matches!(
        session.set_collection_config(&txn, "/db/c", no_target),
        Err(Error::Config(_))
    ));

    let bad_boost = r#"<collection><index><fulltext>
        <text qname="p" match-attr-name="rend" match-attr-boost="abc"/>
    </fulltext></index></collection>"#;
    assert!(matches!(
        session.set_collection_config(&txn, "/db/c", bad_boost),
        Err(Error::Config(_))
    ));
    assert!(session.collection_spec("/db/c").is_none());
}

#[test]
fn engines_missing_from_configuration_see_nothing() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, "/db/rdf", RDF_CONFIG, "test1.xml", RDF_DOC);

    let spec = session.collection_spec("/db/rdf").unwrap();
    assert!(spec.contains(IndexKind::Rdf));
    assert!(!spec.contains(IndexKind::FullText));
    assert!(session.query(IndexKind::FullText, "property").unwrap().is_empty());
    assert_eq!(session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap().len(), 2);
    assert_eq!(doc.collection, "/db/rdf");
}

#[test]
fn subcollections_inherit_configuration() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let txn = session.begin();
    session.set_collection_config(&txn, "/db", RDF_CONFIG).unwrap();
    session
        .store_document(&txn, "/db/deep/er", "test1.xml", RDF_DOC)
        .unwrap();
    assert_eq!(session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap().len(), 2);
}

#[test]
fn rdf_base_option_overrides_document_uri() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let config = r#"<collection><index><rdf base="http://example.org/doc"/></index></collection>"#;
    test_db.configure_and_store(&session, "/db/rdf", config, "test1.xml", RDF_DOC);

    let result = session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap();
    assert_eq!(
        result.solutions().unwrap().column("x"),
        vec![
            Some("<http://example.org/doc#biologicalFather>"),
            Some("<http://example.org/doc#biologicalParent>"),
        ]
    );
}

#[test]
fn unknown_file_mode_fails_open() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        indexes: vec![IndexModuleConfig::new(IndexKind::Rdf).with_option("file_mode", "paged")],
        ..DatabaseConfig::default()
    };
    assert!(matches!(
        nodex::open_with_config(dir.path(), config),
        Err(Error::Config(_))
    ));
}

#[test]
fn duplicate_engine_in_toml_is_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("nodex.toml"),
        "[[index]]\nkind = \"rdf\"\n\n[[index]]\nkind = \"rdf\"\n",
    )
    .unwrap();
    assert!(matches!(nodex::open(dir.path()), Err(Error::Config(_))));
}
