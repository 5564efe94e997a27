//! Flush modes across both engines

use crate::common::*;
use nodex::{Error, IndexKind, Mode, ScanHints};
use std::sync::Arc;
use std::thread;

const COLLECTION: &str = "/db/mixed";

const BOTH: &str = r#"<collection xmlns="http://exist-db.org/collection-config/1.0">
    <index>
        <fulltext>
            <text qname="rdfs:label" xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"/>
        </fulltext>
        <rdf/>
    </index>
</collection>"#;

const LABELLED: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
  <rdf:Description rdf:about="http://example.org/rust">
    <rdfs:label>Rust language</rdfs:label>
  </rdf:Description>
</rdf:RDF>"#;

fn scan_len(session: &nodex::Session, kind: IndexKind, doc: &nodex::DocumentRef) -> usize {
    session
        .scan_index(kind, std::slice::from_ref(doc), None, &ScanHints::new())
        .unwrap()
        .len()
}

#[test]
fn store_then_remove_all_leaves_nothing() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, BOTH, "rust.xml", LABELLED);
    assert_eq!(session.query(IndexKind::FullText, "rust").unwrap().len(), 1);
    assert!(scan_len(&session, IndexKind::Rdf, &doc) > 0);

    let txn = session.begin();
    session.remove_document(&txn, &doc.uri).unwrap();
    assert_eq!(scan_len(&session, IndexKind::FullText, &doc), 0);
    assert_eq!(scan_len(&session, IndexKind::Rdf, &doc), 0);

    // a second RemoveAll for the same document changes nothing
    let spec = session.collection_spec(COLLECTION);
    session
        .controller()
        .remove_document(&txn, &doc, spec.as_deref())
        .unwrap();
    assert_eq!(scan_len(&session, IndexKind::FullText, &doc), 0);
    assert_eq!(scan_len(&session, IndexKind::Rdf, &doc), 0);
    assert!(session.check_index());
}

#[test]
fn remove_some_with_nothing_streamed_is_a_noop() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, BOTH, "rust.xml", LABELLED);
    let before_ft = scan_len(&session, IndexKind::FullText, &doc);
    let before_rdf = scan_len(&session, IndexKind::Rdf, &doc);

    let txn = session.begin();
    let spec = session.collection_spec(COLLECTION);
    session
        .controller()
        .stream(&txn, &doc, spec.as_deref(), Mode::RemoveSome, |_| Ok(()))
        .unwrap();

    assert_eq!(scan_len(&session, IndexKind::FullText, &doc), before_ft);
    assert_eq!(scan_len(&session, IndexKind::Rdf, &doc), before_rdf);
}

#[test]
fn remove_all_after_collection_removal_is_harmless() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, BOTH, "rust.xml", LABELLED);
    let spec = session.collection_spec(COLLECTION);

    let txn = session.begin();
    session.remove_collection(&txn, COLLECTION).unwrap();
    session
        .controller()
        .remove_document(&txn, &doc, spec.as_deref())
        .unwrap();
    session
        .controller()
        .remove_document(&txn, &doc, None)
        .unwrap();

    assert_eq!(scan_len(&session, IndexKind::FullText, &doc), 0);
    assert_eq!(scan_len(&session, IndexKind::Rdf, &doc), 0);
}

#[test]
fn binary_resources_leave_indexes_untouched() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let doc = test_db.configure_and_store(&session, COLLECTION, BOTH, "rust.xml", LABELLED);

    let txn = session.begin();
    let bin = session
        .store_binary(&txn, COLLECTION, "logo.png", vec![0x89, 0x50, 0x4e, 0x47])
        .unwrap();
    session.remove_document(&txn, &bin.uri).unwrap();

    assert_eq!(session.query(IndexKind::FullText, "rust").unwrap().len(), 1);
    assert!(scan_len(&session, IndexKind::Rdf, &doc) > 0);
}

#[test]
fn aborted_transaction_rejects_further_writes() {
    let test_db = TestDb::new();
    let session = test_db.session();
    let mut txn = session.begin();
    session.set_collection_config(&txn, COLLECTION, BOTH).unwrap();
    session.abort(&mut txn, "client gave up").unwrap();

    assert!(matches!(
        session.store_document(&txn, COLLECTION, "rust.xml", LABELLED),
        Err(Error::TransactionAborted(_))
    ));
    assert!(session.query(IndexKind::FullText, "rust").unwrap().is_empty());
}

#[test]
fn concurrent_sessions_index_independently() {
    let test_db = TestDb::new();
    {
        let session = test_db.session();
        let txn = session.begin();
        session.set_collection_config(&txn, COLLECTION, BOTH).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = Arc::clone(&test_db.db);
            thread::spawn(move || {
                let session = db.session();
                let txn = session.begin();
                let xml = LABELLED.replace("http://example.org/rust", &format!("http://example.org/rust{}", i));
                session
                    .store_document(&txn, COLLECTION, &format!("rust{}.xml", i), &xml)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let session = test_db.session();
    assert_eq!(session.query(IndexKind::FullText, "rust").unwrap().len(), 4);
    let labels = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#> SELECT ?s ?l WHERE { ?s rdfs:label ?l }";
    assert_eq!(session.query(IndexKind::Rdf, labels).unwrap().len(), 4);
    assert!(session.check_index());
}
