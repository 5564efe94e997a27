//! Index workers
//!
//! A worker is one engine's per-session context. It is bound to one document
//! at a time with `set_document`, collects that document's entries through
//! its listener and applies them to the engine on `flush` according to the
//! bound [`Mode`]. Workers hold only document-scoped state; everything else
//! lives in the engine they came from.

use crate::indexing::config::IndexConfig;
use crate::indexing::listener::StreamListener;
use crate::indexing::mode::Mode;
use crate::indexing::query::QueryResult;
use crate::indexing::scan::{NodeSet, Occurrences, ScanHints};
use crate::indexing::IndexKind;
use crate::xml::ConfigNode;
use nodex_core::{DocumentRef, Error, Namespaces, NodeId, NodePath, Result};
use std::sync::Arc;

/// Document binding shared by the shipped workers
#[derive(Debug, Clone, Default)]
pub struct DocumentBinding {
    /// Bound document
    pub document: Option<DocumentRef>,
    /// Configuration of the document's collection
    pub config: Option<Arc<IndexConfig>>,
    /// What the current cycle does
    pub mode: Mode,
}

impl DocumentBinding {
    /// Bind a document.
    ///
    /// Without a configuration the document is not indexed by this engine,
    /// except that `RemoveAll` still binds it so leftover entries from an
    /// earlier configuration are dropped.
    pub fn bind(&mut self, doc: &DocumentRef, config: Option<Arc<IndexConfig>>, mode: Mode) {
        self.document = match (&config, mode) {
            (Some(_), _) | (None, Mode::RemoveAll) => Some(doc.clone()),
            (None, _) => None,
        };
        self.config = config;
        self.mode = mode;
    }

    /// Forget the bound document
    pub fn clear(&mut self) {
        self.document = None;
        self.config = None;
        self.mode = Mode::Store;
    }

    /// Whether the bound document receives events in the current mode
    pub fn wants_events(&self) -> bool {
        self.document.is_some() && self.config.is_some() && self.mode.streams()
    }
}

/// Per-session context of one index engine
pub trait IndexWorker: Send {
    /// Engine this worker belongs to
    fn kind(&self) -> IndexKind;

    /// Look for this engine's element among the children of a collection's
    /// `<index>` block and parse it.
    ///
    /// Returns `Ok(None)` when the engine is not configured for the
    /// collection.
    ///
    /// # Errors
    /// `Error::Config` when the engine element is present but invalid.
    fn configure(&self, nodes: &[ConfigNode], namespaces: &Namespaces) -> Result<Option<IndexConfig>>;

    /// Bind a document for the next streaming cycle, resetting all
    /// document-scoped state
    fn set_document(&mut self, doc: &DocumentRef, config: Option<Arc<IndexConfig>>, mode: Mode);

    /// Change the mode of the current binding
    fn set_mode(&mut self, mode: Mode);

    /// Current mode
    fn mode(&self) -> Mode;

    /// Bound document, if any
    fn document(&self) -> Option<&DocumentRef>;

    /// Listener for the current cycle, or `None` when the engine needs no
    /// events (no document bound, not configured, or `RemoveAll`)
    fn listener(&mut self) -> Option<&mut dyn StreamListener>;

    /// Topmost node that must be re-streamed when `node` is inserted or
    /// removed, or `None` if the node itself suffices
    fn reindex_root(
        &self,
        node: &NodeId,
        path: &NodePath,
        config: Option<&IndexConfig>,
        insert: bool,
        include_self: bool,
    ) -> Option<NodeId>;

    /// Apply buffered entries according to the mode. The buffer is empty
    /// afterwards whatever the outcome.
    fn flush(&mut self) -> Result<()>;

    /// Drop buffered entries without touching the engine
    fn discard(&mut self);

    /// Remove everything indexed for the given documents of a collection
    fn remove_collection(
        &mut self,
        collection: &str,
        documents: &[DocumentRef],
        config: Option<&IndexConfig>,
    ) -> Result<()>;

    /// Consistency check of the engine's data
    fn check_index(&self) -> bool;

    /// Distinct keys held for `documents`, filtered by `hints` and
    /// optionally restricted to the subtrees of `context`
    fn scan_index(
        &self,
        documents: &[DocumentRef],
        context: Option<&NodeSet>,
        hints: &ScanHints,
    ) -> Result<Vec<Occurrences>>;

    /// Engine-specific query entry point
    fn query(&self, query: &str) -> Result<QueryResult> {
        Err(Error::query(format!(
            "index '{}' does not accept queries: {}",
            self.kind(),
            query
        )))
    }
}

/// Find the engine element named `element` among `nodes` and parse it.
///
/// `nodes` are the children of the `<index>` block; the first match wins.
pub fn configure_from(
    nodes: &[ConfigNode],
    namespaces: &Namespaces,
    element: &str,
    rule_element: &str,
) -> Result<Option<IndexConfig>> {
    match nodes.iter().find(|n| n.local_name() == element) {
        Some(node) => IndexConfig::parse(node, namespaces, rule_element).map(Some),
        None => Ok(None),
    }
}
