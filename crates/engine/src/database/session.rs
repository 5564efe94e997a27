//! Sessions
//!
//! A session is the worker context of one client: it owns an
//! [`IndexController`] over its own workers and performs every document
//! mutation through it, so index state always follows the store.
//!
//! Writers hold the document's exclusive lock across the structural change
//! and the index flush; readers hold shared locks while they query index
//! content derived from the documents.

use super::{join_uri, split_uri, Database};
use crate::indexing::{
    IndexController, IndexKind, IndexSpec, Mode, NodeSet, Occurrences, QueryResult, ScanHints,
};
use crate::storage::{Collection, Document, Resource};
use crate::xml::ConfigNode;
use nodex_concurrency::{DocumentReadGuard, Transaction};
use nodex_core::{DocumentRef, Error, NodeId, QName, Result, SessionId};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

const INDEX_ELEMENT: &str = "index";

/// A client's context on a database
pub struct Session {
    id: SessionId,
    db: Arc<Database>,
    controller: IndexController,
    closed: bool,
}

impl Session {
    pub(crate) fn new(db: Arc<Database>, id: SessionId) -> Self {
        let controller = db.indexes().controller(id);
        debug!(target: "nodex::db", session = %id, "Session opened");
        Session {
            id,
            db,
            controller,
            closed: false,
        }
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Database the session works on
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// The session's index controller
    pub fn controller(&self) -> &IndexController {
        &self.controller
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start a write transaction
    pub fn begin(&self) -> Transaction {
        self.db.transactions().begin()
    }

    /// Commit a transaction
    pub fn commit(&self, txn: &mut Transaction) -> Result<()> {
        self.db.transactions().commit(txn)
    }

    /// Abort a transaction, dropping every buffered index entry
    pub fn abort(&self, txn: &mut Transaction, reason: impl Into<String>) -> Result<()> {
        self.controller.discard_all();
        self.db.transactions().abort(txn, reason)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Create an empty collection if it does not exist
    pub fn create_collection(&self, uri: &str) -> Result<()> {
        self.db.ensure_open()?;
        self.db
            .collections()
            .write()
            .entry(uri.to_string())
            .or_insert_with(|| Collection::new(uri));
        Ok(())
    }

    /// Parse a collection configuration and make it the collection's index
    /// configuration.
    ///
    /// `xml` is either an `<index>` element or an element containing one
    /// (such as `<collection>`). Documents already stored keep their index
    /// entries until [`Session::reindex_collection`] is called.
    ///
    /// # Errors
    /// `Error::Config` when the fragment or any engine element in it is
    /// invalid; the collection keeps its previous configuration.
    pub fn set_collection_config(&self, txn: &Transaction, uri: &str, xml: &str) -> Result<()> {
        self.db.ensure_open()?;
        txn.ensure_active()?;
        let root = ConfigNode::parse(xml)?;
        let index = if root.local_name() == INDEX_ELEMENT {
            &root
        } else {
            root.child(INDEX_ELEMENT).ok_or_else(|| {
                Error::config(format!("collection configuration for {} has no <index>", uri))
            })?
        };

        let spec = self
            .controller
            .configure_all(&index.children, &index.namespaces)?;
        info!(
            target: "nodex::db",
            collection = uri,
            engines = ?spec.kinds().collect::<Vec<_>>(),
            "Collection configured"
        );

        self.db
            .collections()
            .write()
            .entry(uri.to_string())
            .or_insert_with(|| Collection::new(uri))
            .set_spec(spec, xml);
        Ok(())
    }

    /// Index configuration in effect for a collection
    pub fn collection_spec(&self, uri: &str) -> Option<Arc<IndexSpec>> {
        self.db.spec_for(uri)
    }

    /// References of the resources in a collection
    ///
    /// # Errors
    /// `Error::NotFound` if the collection does not exist.
    pub fn documents(&self, uri: &str) -> Result<Vec<DocumentRef>> {
        self.db
            .collections()
            .read()
            .get(uri)
            .map(Collection::documents)
            .ok_or_else(|| Error::not_found(format!("collection {}", uri)))
    }

    /// Remove a collection, its sub-collections and every resource in them,
    /// with all of their index entries.
    ///
    /// # Errors
    /// `Error::NotFound` if the collection does not exist.
    pub fn remove_collection(&self, txn: &Transaction, uri: &str) -> Result<()> {
        self.db.ensure_open()?;
        txn.ensure_active()?;
        let prefix = format!("{}/", uri.trim_end_matches('/'));
        let targets: Vec<(String, Vec<DocumentRef>)> = {
            let collections = self.db.collections().read();
            if !collections.contains_key(uri) {
                return Err(Error::not_found(format!("collection {}", uri)));
            }
            collections
                .iter()
                .filter(|(k, _)| k.as_str() == uri || k.starts_with(&prefix))
                .map(|(k, c)| (k.clone(), c.documents()))
                .collect()
        };

        for (collection, documents) in &targets {
            let _guards = documents
                .iter()
                .map(|d| self.db.locks().write(d.id))
                .collect::<Result<Vec<_>>>()?;
            let spec = self.db.spec_for(collection);
            self.controller
                .remove_collection(collection, documents, spec.as_deref())?;
            self.db.collections().write().remove(collection);
            info!(target: "nodex::db", collection = %collection, documents = documents.len(), "Collection removed");
        }
        for (_, documents) in &targets {
            for doc in documents {
                self.db.locks().forget(doc.id);
            }
        }
        Ok(())
    }

    /// Drop and rebuild the index entries of every document in a collection
    /// with its current configuration
    pub fn reindex_collection(&self, txn: &Transaction, uri: &str) -> Result<()> {
        for doc in self.documents(uri)? {
            if doc.binary {
                continue;
            }
            let _guard = self.db.locks().write(doc.id)?;
            let spec = self.db.spec_for(&doc.collection);
            self.controller.remove_document(txn, &doc, spec.as_deref())?;
            let document = self.xml(&doc.uri)?;
            let document = document.read();
            self.controller
                .stream(txn, &doc, spec.as_deref(), Mode::Store, |pipeline| {
                    document.walk_all(pipeline, Mode::Store)
                })?;
        }
        Ok(())
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Parse and store an XML document, indexing it with the collection's
    /// configuration. A resource of the same name is replaced.
    ///
    /// # Errors
    /// `Error::Serialization` for malformed XML (nothing is stored);
    /// `Error::LockTimeout` if the replaced document is locked.
    pub fn store_document(
        &self,
        txn: &Transaction,
        collection: &str,
        name: &str,
        xml: &str,
    ) -> Result<DocumentRef> {
        self.db.ensure_open()?;
        txn.ensure_active()?;
        let uri = join_uri(collection, name);
        let doc = DocumentRef::new(self.db.allocate_document_id(), uri.as_str());
        let document = Document::parse(doc.clone(), xml)?;

        if self.db.resource(&uri).is_some() {
            self.remove_document(txn, &uri)?;
        }

        let _guard = self.db.locks().write(doc.id)?;
        let document = Arc::new(RwLock::new(document));
        self.insert_resource(collection, name, Resource::Xml(Arc::clone(&document)));

        let spec = self.db.spec_for(&doc.collection);
        let indexed = {
            let document = document.read();
            self.controller
                .stream(txn, &doc, spec.as_deref(), Mode::Store, |pipeline| {
                    document.walk_all(pipeline, Mode::Store)
                })
        };
        if let Err(e) = indexed {
            self.take_resource(&doc);
            return Err(e);
        }

        info!(target: "nodex::db", doc = %doc, nodes = document.read().node_count(), "Document stored");
        Ok(doc)
    }

    /// Store a binary resource; binary resources are never indexed
    pub fn store_binary(
        &self,
        txn: &Transaction,
        collection: &str,
        name: &str,
        data: Vec<u8>,
    ) -> Result<DocumentRef> {
        self.db.ensure_open()?;
        txn.ensure_active()?;
        let uri = join_uri(collection, name);
        if self.db.resource(&uri).is_some() {
            self.remove_document(txn, &uri)?;
        }
        let doc = DocumentRef::new(self.db.allocate_document_id(), uri).binary();
        self.insert_resource(
            collection,
            name,
            Resource::Binary {
                doc: doc.clone(),
                data: Arc::new(data),
            },
        );
        debug!(target: "nodex::db", doc = %doc, "Binary resource stored");
        Ok(doc)
    }

    /// Remove a resource and everything indexed for it
    ///
    /// # Errors
    /// `Error::NotFound` if no resource is stored under `uri`.
    pub fn remove_document(&self, txn: &Transaction, uri: &str) -> Result<()> {
        self.db.ensure_open()?;
        txn.ensure_active()?;
        let doc = self.document(uri)?;
        {
            let _guard = self.db.locks().write(doc.id)?;
            let spec = self.db.spec_for(&doc.collection);
            self.controller.remove_document(txn, &doc, spec.as_deref())?;
            self.take_resource(&doc);
        }
        self.db.locks().forget(doc.id);
        info!(target: "nodex::db", doc = %doc, "Document removed");
        Ok(())
    }

    /// Remove nodes (and their subtrees) from a stored document.
    ///
    /// For each node, engines may ask for a larger subtree to be re-streamed
    /// (its reindex root). Those subtrees are streamed in `RemoveSome` mode,
    /// the nodes are deleted, and whatever is left of the subtrees is
    /// streamed again in `Store` mode.
    ///
    /// # Errors
    /// `Error::NotFound` if the document or one of the nodes does not exist;
    /// nothing is changed in that case.
    pub fn remove_nodes(&self, txn: &Transaction, uri: &str, nodes: &[NodeId]) -> Result<()> {
        self.db.ensure_open()?;
        txn.ensure_active()?;
        let doc = self.document(uri)?;
        let document = self.xml(uri)?;
        let _guard = self.db.locks().write(doc.id)?;
        let spec = self.db.spec_for(&doc.collection);
        let mut document = document.write();

        let mut roots = Vec::with_capacity(nodes.len());
        for node in nodes {
            let path = document.path_to(node)?;
            let root = self
                .controller
                .reindex_root(node, &path, spec.as_deref(), false, true)
                .unwrap_or_else(|| node.clone());
            roots.push(root);
        }
        roots.sort();
        roots.dedup();
        let roots: Vec<NodeId> = roots
            .iter()
            .filter(|r| !roots.iter().any(|other| r.is_descendant_of(other)))
            .cloned()
            .collect();

        {
            let document = &*document;
            self.controller
                .stream(txn, &doc, spec.as_deref(), Mode::RemoveSome, |pipeline| {
                    roots
                        .iter()
                        .try_for_each(|root| document.walk(root, pipeline, Mode::RemoveSome))
                })?;
        }

        for node in nodes {
            if document.contains(node) {
                document.remove_subtree(node)?;
            }
        }

        let survivors: Vec<&NodeId> = roots.iter().filter(|r| document.contains(r)).collect();
        if !survivors.is_empty() {
            let document = &*document;
            self.controller
                .stream(txn, &doc, spec.as_deref(), Mode::Store, |pipeline| {
                    survivors
                        .iter()
                        .try_for_each(|root| document.walk(root, pipeline, Mode::Store))
                })?;
        }

        debug!(target: "nodex::db", doc = %doc, removed = nodes.len(), "Nodes removed");
        Ok(())
    }

    /// Reference of the resource stored under `uri`
    ///
    /// # Errors
    /// `Error::NotFound` if there is none.
    pub fn document(&self, uri: &str) -> Result<DocumentRef> {
        self.db
            .resource(uri)
            .map(|r| r.document_ref())
            .ok_or_else(|| Error::not_found(format!("document {}", uri)))
    }

    /// Ids of the elements named `qname` in a stored document
    pub fn find_nodes(&self, uri: &str, qname: &QName) -> Result<Vec<NodeId>> {
        let doc = self.document(uri)?;
        let document = self.xml(uri)?;
        let _guard = self.db.locks().read(doc.id)?;
        let nodes = document.read().find_elements(qname);
        Ok(nodes)
    }

    /// Text content below a node of a stored document
    pub fn text_content(&self, uri: &str, node: &NodeId) -> Result<String> {
        let document = self.xml(uri)?;
        let text = document.read().text_content(node);
        Ok(text)
    }

    fn xml(&self, uri: &str) -> Result<Arc<RwLock<Document>>> {
        match self.db.resource(uri) {
            Some(Resource::Xml(document)) => Ok(document),
            Some(Resource::Binary { .. }) => Err(Error::invalid_operation(format!(
                "{} is a binary resource",
                uri
            ))),
            None => Err(Error::not_found(format!("document {}", uri))),
        }
    }

    fn insert_resource(&self, collection: &str, name: &str, resource: Resource) {
        self.db
            .collections()
            .write()
            .entry(collection.to_string())
            .or_insert_with(|| Collection::new(collection))
            .insert(name, resource);
    }

    fn take_resource(&self, doc: &DocumentRef) {
        if let Ok((collection, name)) = split_uri(&doc.uri) {
            if let Some(c) = self.db.collections().write().get_mut(collection) {
                c.remove(name);
            }
        }
    }

    // ========================================================================
    // Index access
    // ========================================================================

    /// Query one engine while holding read locks on every stored document
    ///
    /// # Errors
    /// `Error::NotFound` if the engine is not loaded; `Error::Query` for a
    /// malformed or unsupported query.
    pub fn query(&self, kind: IndexKind, query: &str) -> Result<QueryResult> {
        self.db.ensure_open()?;
        let documents: Vec<DocumentRef> = self
            .db
            .collections()
            .read()
            .values()
            .flat_map(Collection::documents)
            .collect();
        let _guards = self.read_locks(&documents)?;
        self.controller.query(kind, query)
    }

    /// Scan one engine for the given documents
    pub fn scan_index(
        &self,
        kind: IndexKind,
        documents: &[DocumentRef],
        context: Option<&NodeSet>,
        hints: &ScanHints,
    ) -> Result<Vec<Occurrences>> {
        self.db.ensure_open()?;
        let _guards = self.read_locks(documents)?;
        self.controller.scan_index(kind, documents, context, hints)
    }

    /// Consistency check of every engine
    pub fn check_index(&self) -> bool {
        self.controller.check_index()
    }

    fn read_locks(&self, documents: &[DocumentRef]) -> Result<Vec<DocumentReadGuard>> {
        documents
            .iter()
            .map(|d| self.db.locks().read(d.id))
            .collect()
    }

    /// Release the session's workers
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.db.indexes().release_session(self.id);
            debug!(target: "nodex::db", session = %self.id, "Session closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseConfig, IndexModuleConfig};
    use crate::indexing::testing::{recording_factory, RecordingIndex};
    use crate::indexing::{Index, IndexManager};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
<collection xmlns="http://exist-db.org/collection-config/1.0">
  <index>
    <fulltext/>
    <rdf/>
  </index>
</collection>"#;

    const DOC: &str = r#"<a><b n="1">x</b><c><d>y</d></c></a>"#;

    fn open(dir: &TempDir) -> Arc<Database> {
        Database::open(dir.path(), &recording_factory()).unwrap()
    }

    fn recording(db: &Database, kind: IndexKind) -> Arc<RecordingIndex> {
        assert!(db.indexes().index(kind).is_some());
        RecordingIndex::last_built(kind)
    }

    #[test]
    fn test_store_and_remove_document() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let mut txn = session.begin();
        session.set_collection_config(&txn, "/db/test", CONFIG).unwrap();
        let doc = session.store_document(&txn, "/db/test", "a.xml", DOC).unwrap();
        assert_eq!(doc.uri, "/db/test/a.xml");

        // a, b, text, c, d, text
        assert_eq!(recording(&db, IndexKind::FullText).state().entries_for(&doc.uri), 6);

        session.remove_document(&txn, &doc.uri).unwrap();
        assert_eq!(recording(&db, IndexKind::FullText).state().entries_for(&doc.uri), 0);
        assert!(matches!(
            session.remove_document(&txn, &doc.uri),
            Err(Error::NotFound(_))
        ));
        session.commit(&mut txn).unwrap();
    }

    #[test]
    fn test_unconfigured_collection_is_not_indexed() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        session.store_document(&txn, "/db/plain", "a.xml", DOC).unwrap();
        assert!(recording(&db, IndexKind::FullText).state().log.is_empty());
    }

    #[test]
    fn test_config_is_inherited_by_subcollections() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        session.set_collection_config(&txn, "/db", CONFIG).unwrap();
        assert!(session.collection_spec("/db/test/deeper").is_some());
        assert!(session.collection_spec("/other").is_none());
    }

    #[test]
    fn test_invalid_config_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        session.set_collection_config(&txn, "/db/test", CONFIG).unwrap();
        let bad = "<collection><index><fulltext><text/></fulltext></index></collection>";
        assert!(matches!(
            session.set_collection_config(&txn, "/db/test", bad),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            session.set_collection_config(&txn, "/db/test", "<collection/>"),
            Err(Error::Config(_))
        ));
        let spec = session.collection_spec("/db/test").unwrap();
        assert!(spec.contains(IndexKind::FullText));
    }

    #[test]
    fn test_malformed_document_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        session.create_collection("/db/test").unwrap();
        assert!(session.store_document(&txn, "/db/test", "bad.xml", "<a>").is_err());
        assert!(session.documents("/db/test").unwrap().is_empty());
    }

    #[test]
    fn test_remove_nodes_restreams_reindex_root() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            lock_timeout_ms: 100,
            indexes: vec![IndexModuleConfig::new(IndexKind::Rdf).with_option("reindex_level", "2")],
        };
        let db = Database::open_with_config(dir.path(), config, &recording_factory()).unwrap();
        let session = db.session();
        let txn = session.begin();
        session.set_collection_config(&txn, "/db/test", CONFIG).unwrap();
        let doc = session.store_document(&txn, "/db/test", "a.xml", DOC).unwrap();
        let rdf = recording(&db, IndexKind::Rdf);
        rdf.state().log.clear();

        // remove <d> (1.3.1); the engine asks for <c> (1.3) to be re-streamed
        let d = NodeId::from_levels(&[1, 3, 1]).unwrap();
        session.remove_nodes(&txn, &doc.uri, &[d]).unwrap();

        let log = rdf.state().log.clone();
        assert_eq!(
            log,
            vec![
                "start:c", "start:d", "text:y", "end:d", "end:c", "flush:remove-some",
                "start:c", "end:c", "flush:store",
            ]
        );
        // a, b, text, c remain
        assert_eq!(rdf.state().entries_for(&doc.uri), 4);
        assert_eq!(session.text_content(&doc.uri, &NodeId::root()).unwrap(), "x");
    }

    #[test]
    fn test_remove_nodes_unknown_node_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        let doc = session.store_document(&txn, "/db/test", "a.xml", DOC).unwrap();
        let missing = NodeId::from_levels(&[1, 9]).unwrap();
        assert!(matches!(
            session.remove_nodes(&txn, &doc.uri, &[missing]),
            Err(Error::NotFound(_))
        ));
        assert_eq!(session.text_content(&doc.uri, &NodeId::root()).unwrap(), "xy");
    }

    #[test]
    fn test_remove_collection_removes_subcollections() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        session.set_collection_config(&txn, "/db/test", CONFIG).unwrap();
        let a = session.store_document(&txn, "/db/test", "a.xml", DOC).unwrap();
        let b = session.store_document(&txn, "/db/test/sub", "b.xml", DOC).unwrap();
        session.remove_collection(&txn, "/db/test").unwrap();

        let ft = recording(&db, IndexKind::FullText);
        assert_eq!(ft.state().entries_for(&a.uri), 0);
        assert_eq!(ft.state().entries_for(&b.uri), 0);
        assert!(db.collection_uris().is_empty());
        assert!(session.remove_document(&txn, &a.uri).is_err());
        assert!(matches!(
            session.remove_collection(&txn, "/db/test"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_binary_resources_are_removed_in_binary_mode() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let txn = session.begin();
        session.set_collection_config(&txn, "/db/test", CONFIG).unwrap();
        let bin = session
            .store_binary(&txn, "/db/test", "logo.png", vec![0x89, 0x50])
            .unwrap();
        assert!(bin.binary);
        session.remove_document(&txn, &bin.uri).unwrap();
        let log = recording(&db, IndexKind::FullText).state().log.clone();
        assert_eq!(log, vec!["flush:remove-binary"]);
    }

    #[test]
    fn test_abort_discards_and_blocks_further_writes() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let session = db.session();
        let mut txn = session.begin();
        session.abort(&mut txn, "client gave up").unwrap();
        assert!(matches!(
            session.store_document(&txn, "/db/test", "a.xml", DOC),
            Err(Error::TransactionAborted(_))
        ));
        assert!(db.resource("/db/test/a.xml").is_none());
    }

    #[test]
    fn test_close_releases_workers() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let first = db.session();
        let second = db.session();
        assert_ne!(first.id(), second.id());
        assert_eq!(recording(&db, IndexKind::Rdf).worker_count(), 2);
        first.close();
        assert_eq!(recording(&db, IndexKind::Rdf).worker_count(), 1);
        drop(second);
        assert_eq!(recording(&db, IndexKind::Rdf).worker_count(), 0);
    }

    #[test]
    fn test_manager_can_be_built_directly() {
        let index = RecordingIndex::new(IndexKind::FullText);
        let manager = IndexManager::new(vec![index as Arc<dyn Index>]);
        assert_eq!(manager.indexes().len(), 1);
    }
}
