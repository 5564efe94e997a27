//! Triple-store worker
//!
//! Per-session context of the RDF engine. In `Store` and `RemoveSome`
//! cycles the listener reads the streamed RDF/XML into a buffer of triples;
//! on flush the buffer is added to or subtracted from the document's named
//! graph. `RemoveAll` drops the graph without listening.

use crate::graph::TripleStore;
use crate::rdfxml::RdfXmlSink;
use crate::sparql;
use nodex_core::{DocumentId, DocumentRef, Namespaces, NodeId, NodePath, Result};
use nodex_engine::indexing::{
    collect_occurrences, configure_from, Deferred, DocumentBinding, IndexConfig, IndexKind,
    IndexWorker, Mode, NodeSet, Occurrences, QueryResult, ScanHints, StreamListener,
};
use nodex_engine::xml::ConfigNode;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Element carrying an RDF configuration
pub const CONFIG_ELEMENT: &str = "rdf";

/// Collection option overriding the base IRI of a document's triples
pub const BASE_OPTION: &str = "base";

/// Tree level of the elements a change is reindexed from: the children of
/// `rdf:RDF`
pub const REINDEX_LEVEL: usize = 2;

/// One session's RDF context
pub struct RdfWorker {
    store: Arc<TripleStore>,
    binding: DocumentBinding,
    listener: Deferred<RdfXmlSink>,
    log_exec: bool,
}

impl RdfWorker {
    /// Worker over a shared store
    pub fn new(store: Arc<TripleStore>) -> Self {
        RdfWorker {
            store,
            binding: DocumentBinding::default(),
            listener: Deferred::new(RdfXmlSink::default()),
            log_exec: false,
        }
    }

    /// Log every query before running it
    pub fn with_log_exec(mut self, log_exec: bool) -> Self {
        self.log_exec = log_exec;
        self
    }

    fn remove_document(&self, doc: &DocumentRef) {
        if self.store.drop_graph(&doc.uri) {
            debug!(target: "nodex::rdf", doc = %doc, "Graph dropped");
        }
    }

    fn base_for(doc: &DocumentRef, config: Option<&IndexConfig>) -> String {
        config
            .and_then(|c| c.option(BASE_OPTION))
            .map_or_else(|| doc.uri.clone(), str::to_string)
    }
}

impl IndexWorker for RdfWorker {
    fn kind(&self) -> IndexKind {
        IndexKind::Rdf
    }

    fn configure(&self, nodes: &[ConfigNode], namespaces: &Namespaces) -> Result<Option<IndexConfig>> {
        // no rule children: every document of the collection is read whole
        configure_from(nodes, namespaces, CONFIG_ELEMENT, "")
    }

    fn set_document(&mut self, doc: &DocumentRef, config: Option<Arc<IndexConfig>>, mode: Mode) {
        self.listener.reset();
        let base = Self::base_for(doc, config.as_deref());
        self.binding.bind(doc, config, mode);
        self.listener.sink_mut().reset(base);
    }

    fn set_mode(&mut self, mode: Mode) {
        self.binding.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.binding.mode
    }

    fn document(&self) -> Option<&DocumentRef> {
        self.binding.document.as_ref()
    }

    fn listener(&mut self) -> Option<&mut dyn StreamListener> {
        if self.binding.wants_events() {
            Some(&mut self.listener)
        } else {
            None
        }
    }

    /// The ancestor-or-self at tree level 2, so a change is always re-read
    /// from the node element that contains it.
    fn reindex_root(
        &self,
        node: &NodeId,
        _path: &NodePath,
        config: Option<&IndexConfig>,
        _insert: bool,
        _include_self: bool,
    ) -> Option<NodeId> {
        config?;
        if node.tree_level() <= REINDEX_LEVEL {
            Some(node.clone())
        } else {
            node.ancestor_at_level(REINDEX_LEVEL)
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.listener.reset();
        let triples = self.listener.sink_mut().take();
        let Some(doc) = self.binding.document.clone() else {
            return Ok(());
        };
        match self.binding.mode {
            Mode::Store => {
                if !triples.is_empty() {
                    let added = self.store.add(&doc.uri, triples);
                    debug!(target: "nodex::rdf", doc = %doc, added, "Triples stored");
                }
            }
            Mode::RemoveSome => {
                if triples.is_empty() {
                    return Ok(());
                }
                match self.store.remove(&doc.uri, triples) {
                    Some(removed) => debug!(target: "nodex::rdf", doc = %doc, removed, "Triples removed"),
                    None => warn!(target: "nodex::rdf", doc = %doc, "Removing triples from a document without a graph"),
                }
            }
            Mode::RemoveAll => self.remove_document(&doc),
            Mode::RemoveBinary => {}
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.listener.reset();
        self.listener.sink_mut().take();
    }

    fn remove_collection(
        &mut self,
        collection: &str,
        documents: &[DocumentRef],
        _config: Option<&IndexConfig>,
    ) -> Result<()> {
        for doc in documents {
            self.remove_document(doc);
        }
        debug!(target: "nodex::rdf", collection, documents = documents.len(), "Collection removed");
        Ok(())
    }

    fn check_index(&self) -> bool {
        self.store.check()
    }

    /// Every subject and object of the documents' graphs, keyed by its
    /// N-Triples form and counted by the triples it occurs in. Graphs carry
    /// no node identity, so a context set is not applied.
    fn scan_index(
        &self,
        documents: &[DocumentRef],
        _context: Option<&NodeSet>,
        hints: &ScanHints,
    ) -> Result<Vec<Occurrences>> {
        let mut entries: Vec<(String, DocumentId, u64)> = Vec::new();
        for doc in documents {
            let Some(graph) = self.store.graph(&doc.uri) else {
                continue;
            };
            let counts: BTreeMap<String, u64> = graph
                .node_counts()
                .into_iter()
                .map(|(term, n)| (term.to_string(), n))
                .collect();
            entries.extend(
                counts
                    .into_iter()
                    .filter(|(key, _)| hints.accepts_key(key))
                    .map(|(key, n)| (key, doc.id, n)),
            );
        }
        Ok(collect_occurrences(entries))
    }

    /// SPARQL `SELECT` over the union of every document's graph
    fn query(&self, query: &str) -> Result<QueryResult> {
        if self.log_exec {
            info!(target: "nodex::rdf", query, "Executing SPARQL query");
        }
        match sparql::select(&self.store.default_graph(), query) {
            Ok(table) => Ok(QueryResult::Solutions(table)),
            Err(e) => {
                warn!(target: "nodex::rdf", error = %e, "SPARQL query failed");
                Err(e)
            }
        }
    }
}
