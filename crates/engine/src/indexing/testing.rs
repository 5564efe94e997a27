//! Recording engine used by this crate's tests
//!
//! Indexes every element and text node id of configured documents, and logs
//! every event and lifecycle call, so tests can observe exactly what the
//! controller and the store drive.

use crate::database::config::IndexModuleConfig;
use crate::indexing::config::IndexConfig;
use crate::indexing::index::{Index, IndexFactory, WorkerHandle};
use crate::indexing::listener::StreamListener;
use crate::indexing::mode::Mode;
use crate::indexing::query::{QueryHit, QueryResult};
use crate::indexing::registry::WorkerRegistry;
use crate::indexing::scan::{collect_occurrences, NodeSet, Occurrences, ScanHints};
use crate::indexing::worker::{configure_from, DocumentBinding, IndexWorker};
use crate::indexing::IndexKind;
use crate::xml::ConfigNode;
use nodex_concurrency::Transaction;
use nodex_core::{
    Attribute, DocumentRef, Element, Error, Namespaces, NodeId, NodePath, Result, SessionId, Text,
};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a recording engine has seen
#[derive(Debug, Default)]
pub(crate) struct RecordedState {
    /// Indexed (document URI, node id) pairs
    pub entries: BTreeSet<(String, String)>,
    /// Events and lifecycle calls in arrival order
    pub log: Vec<String>,
}

impl RecordedState {
    pub fn entries_for(&self, uri: &str) -> usize {
        self.entries.iter().filter(|(u, _)| u == uri).count()
    }
}

thread_local! {
    static BUILT: RefCell<Vec<Arc<RecordingIndex>>> = const { RefCell::new(Vec::new()) };
}

pub(crate) struct RecordingIndex {
    kind: IndexKind,
    opened: AtomicBool,
    fail_open: bool,
    reindex_level: Option<usize>,
    state: Arc<Mutex<RecordedState>>,
    workers: WorkerRegistry<RecordingWorker>,
}

impl RecordingIndex {
    pub fn new(kind: IndexKind) -> Arc<Self> {
        Self::with_options(kind, false, None)
    }

    pub fn with_reindex_level(kind: IndexKind, level: usize) -> Arc<Self> {
        Self::with_options(kind, false, Some(level))
    }

    fn with_options(kind: IndexKind, fail_open: bool, reindex_level: Option<usize>) -> Arc<Self> {
        Arc::new(RecordingIndex {
            kind,
            opened: AtomicBool::new(false),
            fail_open,
            reindex_level,
            state: Arc::new(Mutex::new(RecordedState::default())),
            workers: WorkerRegistry::new(),
        })
    }

    /// Factory constructor; options `fail_open` and `reindex_level`
    pub fn build(module: &IndexModuleConfig, _data_dir: &Path) -> Result<Arc<dyn Index>> {
        let level = module.option("reindex_level").and_then(|l| l.parse().ok());
        let index = Self::with_options(module.kind, module.flag("fail_open"), level);
        BUILT.with(|built| built.borrow_mut().push(Arc::clone(&index)));
        Ok(index)
    }

    /// Most recent engine of `kind` built on this thread by [`recording_factory`]
    pub fn last_built(kind: IndexKind) -> Arc<Self> {
        BUILT.with(|built| {
            built
                .borrow()
                .iter()
                .rev()
                .find(|i| i.kind == kind)
                .cloned()
                .expect("no recording engine built on this thread")
        })
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, RecordedState> {
        self.state.lock()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

pub(crate) fn recording_factory() -> IndexFactory {
    let mut factory = IndexFactory::new();
    factory
        .register(IndexKind::FullText, RecordingIndex::build)
        .register(IndexKind::Rdf, RecordingIndex::build);
    factory
}

impl Index for RecordingIndex {
    fn kind(&self) -> IndexKind {
        self.kind
    }

    fn name(&self) -> &str {
        self.kind.id()
    }

    fn open(&self) -> Result<()> {
        if self.fail_open {
            return Err(Error::engine("refusing to open"));
        }
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.opened.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.close()?;
        self.state.lock().entries.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    fn worker(&self, session: SessionId) -> WorkerHandle {
        self.workers.get_or_create(session, || RecordingWorker {
            kind: self.kind,
            reindex_level: self.reindex_level,
            binding: DocumentBinding::default(),
            listener: RecordingListener {
                buffer: Vec::new(),
                state: Arc::clone(&self.state),
            },
        })
    }

    fn release(&self, session: SessionId) {
        self.workers.release(session);
    }
}

struct RecordingListener {
    buffer: Vec<String>,
    state: Arc<Mutex<RecordedState>>,
}

impl RecordingListener {
    fn record(&mut self, event: String, node: &NodeId) {
        self.state.lock().log.push(event);
        self.buffer.push(node.to_string());
    }
}

impl StreamListener for RecordingListener {
    fn start_element(&mut self, _txn: &Transaction, element: &Element, _path: &NodePath) {
        self.record(format!("start:{}", element.qname.local_name()), &element.node_id);
    }

    fn attribute(&mut self, _txn: &Transaction, attribute: &Attribute, _path: &NodePath) {
        self.state
            .lock()
            .log
            .push(format!("attr:{}={}", attribute.qname.local_name(), attribute.value));
    }

    fn characters(&mut self, _txn: &Transaction, text: &Text, _path: &NodePath) {
        self.record(format!("text:{}", text.data), &text.node_id);
    }

    fn end_element(&mut self, _txn: &Transaction, element: &Element, _path: &NodePath) {
        self.state
            .lock()
            .log
            .push(format!("end:{}", element.qname.local_name()));
    }
}

struct RecordingWorker {
    kind: IndexKind,
    reindex_level: Option<usize>,
    binding: DocumentBinding,
    listener: RecordingListener,
}

impl IndexWorker for RecordingWorker {
    fn kind(&self) -> IndexKind {
        self.kind
    }

    fn configure(&self, nodes: &[ConfigNode], namespaces: &Namespaces) -> Result<Option<IndexConfig>> {
        configure_from(nodes, namespaces, self.kind.config_element(), "text")
    }

    fn set_document(&mut self, doc: &DocumentRef, config: Option<Arc<IndexConfig>>, mode: Mode) {
        self.listener.buffer.clear();
        self.binding.bind(doc, config, mode);
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

    fn reindex_root(
        &self,
        node: &NodeId,
        _path: &NodePath,
        _config: Option<&IndexConfig>,
        _insert: bool,
        _include_self: bool,
    ) -> Option<NodeId> {
        self.reindex_level.and_then(|level| node.ancestor_at_level(level))
    }

    fn flush(&mut self) -> Result<()> {
        let buffer = std::mem::take(&mut self.listener.buffer);
        let Some(doc) = self.binding.document.clone() else {
            return Ok(());
        };
        let mut state = self.listener.state.lock();
        state.log.push(format!("flush:{}", self.binding.mode));
        match self.binding.mode {
            Mode::Store => {
                for node in buffer {
                    state.entries.insert((doc.uri.clone(), node));
                }
            }
            Mode::RemoveSome => {
                for node in buffer {
                    state.entries.remove(&(doc.uri.clone(), node));
                }
            }
            Mode::RemoveAll => state.entries.retain(|(uri, _)| *uri != doc.uri),
            Mode::RemoveBinary => {}
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.listener.buffer.clear();
        self.listener.state.lock().log.push("discard".to_string());
    }

    fn remove_collection(
        &mut self,
        _collection: &str,
        documents: &[DocumentRef],
        _config: Option<&IndexConfig>,
    ) -> Result<()> {
        let mut state = self.listener.state.lock();
        for doc in documents {
            state.entries.retain(|(uri, _)| *uri != doc.uri);
        }
        Ok(())
    }

    fn check_index(&self) -> bool {
        true
    }

    fn scan_index(
        &self,
        documents: &[DocumentRef],
        _context: Option<&NodeSet>,
        hints: &ScanHints,
    ) -> Result<Vec<Occurrences>> {
        let state = self.listener.state.lock();
        let entries = documents.iter().flat_map(|doc| {
            state
                .entries
                .iter()
                .filter(move |(uri, node)| *uri == doc.uri && hints.accepts_key(node))
                .map(move |(_, node)| (node.clone(), doc.id, 1))
        });
        Ok(collect_occurrences(entries))
    }

    fn query(&self, query: &str) -> Result<QueryResult> {
        let state = self.listener.state.lock();
        let hits = state
            .entries
            .iter()
            .filter(|(_, node)| node == query)
            .filter_map(|(uri, node)| {
                node.parse().ok().map(|node_id| QueryHit {
                    document: uri.clone(),
                    node_id,
                    score: 1.0,
                })
            })
            .collect();
        Ok(QueryResult::Hits(hits))
    }
}
