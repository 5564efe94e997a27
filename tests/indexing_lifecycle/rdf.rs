//! Triple-store engine through sessions

use crate::common::*;
use nodex::{Error, IndexKind, QName, QueryResult, ScanHints};

const COLLECTION: &str = "/db/rdf";

fn row_count(result: &QueryResult) -> usize {
    result.solutions().expect("SELECT result").rows.len()
}

#[test]
fn query_returns_both_properties() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);

    let result = session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap();
    let table = result.solutions().unwrap();
    assert_eq!(table.variables, vec!["x"]);
    assert_eq!(
        table.column("x"),
        vec![
            Some(format!("<{}#biologicalFather>", doc.uri).as_str()),
            Some(format!("<{}#biologicalParent>", doc.uri).as_str()),
        ]
    );
    assert!(session.check_index());
}

#[test]
fn broken_query_is_rejected() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);

    let broken = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> SELECT $x WHERE {$x a unknownPrefix:asd }";
    assert!(matches!(
        session.query(IndexKind::Rdf, broken),
        Err(Error::Query(_))
    ));
    assert!(matches!(
        session.query(IndexKind::Rdf, "ASK { ?s ?p ?o }"),
        Err(Error::Query(_))
    ));
}

#[test]
fn removing_a_description_removes_its_triples() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);

    let descriptions = session
        .find_nodes(&doc.uri, &QName::new("Description", RDF_NS))
        .unwrap();
    assert_eq!(descriptions.len(), 2);

    let txn = session.begin();
    session
        .remove_nodes(&txn, &doc.uri, &descriptions[1..])
        .unwrap();

    let result = session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap();
    assert_eq!(row_count(&result), 1);
    assert_eq!(
        result.solutions().unwrap().column("x"),
        vec![Some(format!("<{}#biologicalParent>", doc.uri).as_str())]
    );
    let sub_property = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#> SELECT ?x WHERE { ?x rdfs:subPropertyOf ?y }";
    assert!(session.query(IndexKind::Rdf, sub_property).unwrap().is_empty());
}

#[test]
fn removing_a_property_element_restreams_its_description() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);

    let sub = session
        .find_nodes(
            &doc.uri,
            &QName::new("subPropertyOf", "http://www.w3.org/2000/01/rdf-schema#"),
        )
        .unwrap();
    let txn = session.begin();
    session.remove_nodes(&txn, &doc.uri, &sub).unwrap();

    // the father keeps its type, loses the sub-property link
    assert_eq!(row_count(&session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap()), 2);
    let sub_property = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#> SELECT ?x WHERE { ?x rdfs:subPropertyOf ?y }";
    assert!(session.query(IndexKind::Rdf, sub_property).unwrap().is_empty());
}

#[test]
fn dropping_a_document_empties_the_scan() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "dropDocument.xml", RDF_DOC);

    let before = session
        .scan_index(IndexKind::Rdf, &[doc.clone()], None, &ScanHints::new())
        .unwrap();
    assert!(!before.is_empty());
    assert!(before.iter().all(|o| o.documents.contains(&doc.id)));

    let mut txn = session.begin();
    session.remove_document(&txn, &doc.uri).unwrap();
    session.commit(&mut txn).unwrap();

    let after = session
        .scan_index(IndexKind::Rdf, &[doc], None, &ScanHints::new())
        .unwrap();
    assert!(after.is_empty());
    assert!(session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap().is_empty());
}

#[test]
fn removing_the_collection_empties_the_scan() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "dropDocument.xml", RDF_DOC);

    let mut txn = session.begin();
    session.remove_collection(&txn, COLLECTION).unwrap();
    session.create_collection(COLLECTION).unwrap();
    session.commit(&mut txn).unwrap();

    let after = session
        .scan_index(IndexKind::Rdf, &[doc], None, &ScanHints::new())
        .unwrap();
    assert!(after.is_empty());
}

#[test]
fn scan_counts_graph_nodes_with_prefix_hint() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);

    let property = format!("<{}Property>", RDF_NS);
    let hits = session
        .scan_index(
            IndexKind::Rdf,
            &[doc.clone()],
            None,
            &ScanHints::new().with_start_value(property.clone()),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].term, property);
    assert_eq!(hits[0].occurrences, 2);
    assert_eq!(hits[0].document_count(), 1);
}

#[test]
fn sessions_see_each_others_graphs() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let writer = test_db.session();
    test_db.configure_and_store(&writer, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);
    writer.close();

    let reader = test_db.session();
    assert_eq!(row_count(&reader.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap()), 2);
}

#[test]
fn dataset_survives_restart() {
    let test_db = TestDb::with_engine(IndexKind::Rdf);
    let path = test_db.dir.path().to_path_buf();
    {
        let session = test_db.session();
        test_db.configure_and_store(&session, COLLECTION, RDF_CONFIG, "test1.xml", RDF_DOC);
    }
    test_db.db.shutdown().unwrap();
    let config = test_db.db.config().clone();
    drop(test_db.db);

    let reopened = nodex::open_with_config(&path, config).unwrap();
    let session = reopened.session();
    assert_eq!(row_count(&session.query(IndexKind::Rdf, PROPERTY_QUERY).unwrap()), 2);
}
