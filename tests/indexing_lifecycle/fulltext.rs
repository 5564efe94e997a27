//! Full-text engine through sessions

use crate::common::*;
use nodex::{Error, IndexKind, NodeId, NodeSet, QName, ScanHints};

const COLLECTION: &str = "/db/books";

fn node(levels: &[u32]) -> NodeId {
    NodeId::from_levels(levels).unwrap()
}

#[test]
fn attribute_boost_ranks_marked_paragraph_first() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, FULLTEXT_CONFIG, "book.xml", BOOK);

    let result = session.query(IndexKind::FullText, "ownership").unwrap();
    let hits = result.hits().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document, doc.uri);
    // <p rend="important"> (boost 4) outranks <title> (boost 2)
    assert_eq!(hits[0].node_id, node(&[1, 2]));
    assert_eq!(hits[1].node_id, node(&[1, 1]));
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn field_prefix_restricts_hits() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    test_db.configure_and_store(&session, COLLECTION, FULLTEXT_CONFIG, "book.xml", BOOK);

    let result = session.query(IndexKind::FullText, "para:ownership").unwrap();
    let hits = result.hits().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node_id, node(&[1, 2]));
}

#[test]
fn inline_joins_words_and_ignore_skips_text() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    test_db.configure_and_store(&session, COLLECTION, FULLTEXT_CONFIG, "book.xml", BOOK);

    let joined = session.query(IndexKind::FullText, "lifetimes everywhere").unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined.hits().unwrap()[0].node_id, node(&[1, 3]));

    assert!(session.query(IndexKind::FullText, "times").unwrap().is_empty());
    assert!(session.query(IndexKind::FullText, "scribble").unwrap().is_empty());
}

#[test]
fn query_without_terms_is_an_error() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    assert!(matches!(
        session.query(IndexKind::FullText, "a ,"),
        Err(Error::Query(_))
    ));
    assert!(matches!(
        session.query(IndexKind::Rdf, "SELECT ?s WHERE { ?s ?p ?o }"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn scan_filters_by_prefix_name_and_context() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, FULLTEXT_CONFIG, "book.xml", BOOK);
    let docs = [doc.clone()];

    let all = session
        .scan_index(IndexKind::FullText, &docs, None, &ScanHints::new())
        .unwrap();
    let ownership = all.iter().find(|o| o.term == "ownership").unwrap();
    assert_eq!(ownership.occurrences, 2);
    assert_eq!(ownership.document_count(), 1);

    let prefixed = session
        .scan_index(IndexKind::FullText, &docs, None, &ScanHints::new().with_start_value("ev"))
        .unwrap();
    assert_eq!(prefixed.iter().map(|o| o.term.as_str()).collect::<Vec<_>>(), vec!["everywhere"]);

    let titles = session
        .scan_index(
            IndexKind::FullText,
            &docs,
            None,
            &ScanHints::new().with_qnames(vec![QName::local("title")]),
        )
        .unwrap();
    assert_eq!(
        titles.iter().map(|o| o.term.as_str()).collect::<Vec<_>>(),
        vec!["in", "ownership", "practice"]
    );

    let context: NodeSet = [(doc.id, node(&[1, 3]))].into_iter().collect();
    let scoped = session
        .scan_index(IndexKind::FullText, &docs, Some(&context), &ScanHints::new())
        .unwrap();
    assert_eq!(
        scoped.iter().map(|o| o.term.as_str()).collect::<Vec<_>>(),
        vec!["everywhere", "lifetimes"]
    );
}

#[test]
fn removing_a_paragraph_drops_only_its_terms() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, FULLTEXT_CONFIG, "book.xml", BOOK);

    let txn = session.begin();
    session.remove_nodes(&txn, &doc.uri, &[node(&[1, 2])]).unwrap();

    let hits = session.query(IndexKind::FullText, "ownership").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits.hits().unwrap()[0].node_id, node(&[1, 1]));
    assert!(session.query(IndexKind::FullText, "borrowing").unwrap().is_empty());
    assert_eq!(session.query(IndexKind::FullText, "everywhere").unwrap().len(), 1);
}

#[test]
fn reindexing_applies_a_new_configuration() {
    let test_db = TestDb::with_engine(IndexKind::FullText);
    let session = test_db.session();
    test_db.configure_and_store(&session, COLLECTION, FULLTEXT_CONFIG, "book.xml", BOOK);

    let txn = session.begin();
    let titles_only = r#"<collection><index><fulltext><text qname="title"/></fulltext></index></collection>"#;
    session.set_collection_config(&txn, COLLECTION, titles_only).unwrap();
    // entries from the old configuration stay until reindexed
    assert_eq!(session.query(IndexKind::FullText, "borrowing").unwrap().len(), 1);

    session.reindex_collection(&txn, COLLECTION).unwrap();
    assert!(session.query(IndexKind::FullText, "borrowing").unwrap().is_empty());
    assert_eq!(session.query(IndexKind::FullText, "ownership").unwrap().len(), 1);
}
