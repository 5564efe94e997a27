//! Index controller
//!
//! A session's view of every loaded engine. The controller holds one worker
//! per engine and drives them through each mutation cycle:
//!
//! 1. `set_document(doc, config, mode)` on every worker
//! 2. collect the listeners that want events
//! 3. let the store walk the affected nodes through a [`StreamPipeline`]
//! 4. `flush` every worker, or `discard` them all if the walk failed

use crate::indexing::config::{IndexConfig, IndexSpec};
use crate::indexing::index::WorkerHandle;
use crate::indexing::listener::{StreamListener, StreamPipeline};
use crate::indexing::manager::IndexManager;
use crate::indexing::mode::Mode;
use crate::indexing::query::QueryResult;
use crate::indexing::scan::{NodeSet, Occurrences, ScanHints};
use crate::indexing::IndexKind;
use crate::xml::ConfigNode;
use nodex_concurrency::Transaction;
use nodex_core::{DocumentRef, Error, Namespaces, NodeId, NodePath, Result, SessionId};
use tracing::{debug, warn};

/// Per-session dispatcher over all engines
pub struct IndexController {
    session: SessionId,
    workers: Vec<(IndexKind, WorkerHandle)>,
}

impl IndexController {
    /// Controller holding the session's worker of every loaded engine
    pub fn new(manager: &IndexManager, session: SessionId) -> Self {
        let workers = manager
            .indexes()
            .iter()
            .map(|index| (index.kind(), index.worker(session)))
            .collect();
        IndexController { session, workers }
    }

    /// Session the workers belong to
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Engines this controller dispatches to
    pub fn kinds(&self) -> impl Iterator<Item = IndexKind> + '_ {
        self.workers.iter().map(|(k, _)| *k)
    }

    /// The session's worker for an engine
    pub fn worker(&self, kind: IndexKind) -> Option<WorkerHandle> {
        self.workers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| WorkerHandle::clone(w))
    }

    /// Parse one engine's configuration out of an `<index>` block's children
    ///
    /// # Errors
    /// `Error::NotFound` if the engine is not loaded; `Error::Config` if its
    /// element is invalid.
    pub fn configure(
        &self,
        kind: IndexKind,
        nodes: &[ConfigNode],
        namespaces: &Namespaces,
    ) -> Result<Option<IndexConfig>> {
        let worker = self
            .worker(kind)
            .ok_or_else(|| Error::not_found(format!("index '{}' is not loaded", kind)))?;
        let config = worker.lock().configure(nodes, namespaces)?;
        Ok(config)
    }

    /// Parse every engine's configuration for a collection.
    ///
    /// # Errors
    /// The first invalid engine element fails the whole call.
    pub fn configure_all(&self, nodes: &[ConfigNode], namespaces: &Namespaces) -> Result<IndexSpec> {
        let mut spec = IndexSpec::new();
        for (kind, worker) in &self.workers {
            if let Some(config) = worker.lock().configure(nodes, namespaces)? {
                debug!(target: "nodex::index", kind = %kind, rules = config.rules().len(), "Engine configured");
                spec.insert(*kind, config);
            }
        }
        Ok(spec)
    }

    /// Run one streaming cycle.
    ///
    /// Every worker is bound to `doc` in `mode` with its engine's
    /// configuration from `spec`. `producer` then walks the affected nodes
    /// through the pipeline. On success every worker flushes; the first
    /// flush error is returned after all workers have flushed. If the
    /// producer fails, every worker discards its buffer and the error is
    /// returned.
    pub fn stream<F>(
        &self,
        txn: &Transaction,
        doc: &DocumentRef,
        spec: Option<&IndexSpec>,
        mode: Mode,
        producer: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut StreamPipeline<'_>) -> Result<()>,
    {
        txn.ensure_active()?;

        let mut guards: Vec<_> = self.workers.iter().map(|(_, w)| w.lock()).collect();
        for guard in guards.iter_mut() {
            let config = spec.and_then(|s| s.get(guard.kind()));
            guard.set_document(doc, config, mode);
        }

        let outcome = {
            let listeners: Vec<&mut dyn StreamListener> =
                guards.iter_mut().filter_map(|g| g.listener()).collect();
            let mut pipeline = StreamPipeline::new(txn, listeners);
            let outcome = producer(&mut pipeline);
            debug!(
                target: "nodex::stream",
                doc = %doc,
                mode = %mode,
                listeners = pipeline.len(),
                events = pipeline.event_count(),
                "Streaming cycle finished"
            );
            outcome
        };

        if let Err(e) = outcome {
            warn!(target: "nodex::stream", doc = %doc, error = %e, "Streaming failed, discarding index buffers");
            for guard in guards.iter_mut() {
                guard.discard();
            }
            return Err(e);
        }

        let mut first_error = None;
        for guard in guards.iter_mut() {
            if let Err(e) = guard.flush() {
                warn!(target: "nodex::index", kind = %guard.kind(), doc = %doc, error = %e, "Flush failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Drop everything indexed for a document
    pub fn remove_document(
        &self,
        txn: &Transaction,
        doc: &DocumentRef,
        spec: Option<&IndexSpec>,
    ) -> Result<()> {
        let mode = if doc.binary {
            Mode::RemoveBinary
        } else {
            Mode::RemoveAll
        };
        self.stream(txn, doc, spec, mode, |_| Ok(()))
    }

    /// Drop everything indexed for the documents of a collection
    pub fn remove_collection(
        &self,
        collection: &str,
        documents: &[DocumentRef],
        spec: Option<&IndexSpec>,
    ) -> Result<()> {
        for (kind, worker) in &self.workers {
            let config = spec.and_then(|s| s.get(*kind));
            worker
                .lock()
                .remove_collection(collection, documents, config.as_deref())?;
        }
        Ok(())
    }

    /// Topmost node any engine needs re-streamed when `node` changes.
    ///
    /// Returns `None` when no engine needs more than the node itself.
    pub fn reindex_root(
        &self,
        node: &NodeId,
        path: &NodePath,
        spec: Option<&IndexSpec>,
        insert: bool,
        include_self: bool,
    ) -> Option<NodeId> {
        self.workers
            .iter()
            .filter_map(|(kind, worker)| {
                let config = spec.and_then(|s| s.get(*kind));
                worker
                    .lock()
                    .reindex_root(node, path, config.as_deref(), insert, include_self)
            })
            .min_by_key(NodeId::tree_level)
    }

    /// Drop buffered state of every worker
    pub fn discard_all(&self) {
        for (_, worker) in &self.workers {
            worker.lock().discard();
        }
    }

    /// Consistency check of every engine
    pub fn check_index(&self) -> bool {
        self.workers.iter().all(|(_, w)| w.lock().check_index())
    }

    /// Scan one engine
    ///
    /// # Errors
    /// `Error::NotFound` if the engine is not loaded.
    pub fn scan_index(
        &self,
        kind: IndexKind,
        documents: &[DocumentRef],
        context: Option<&NodeSet>,
        hints: &ScanHints,
    ) -> Result<Vec<Occurrences>> {
        let worker = self
            .worker(kind)
            .ok_or_else(|| Error::not_found(format!("index '{}' is not loaded", kind)))?;
        let result = worker.lock().scan_index(documents, context, hints);
        result
    }

    /// Query one engine
    ///
    /// # Errors
    /// `Error::NotFound` if the engine is not loaded; `Error::Query` for a
    /// malformed or unsupported query.
    pub fn query(&self, kind: IndexKind, query: &str) -> Result<QueryResult> {
        let worker = self
            .worker(kind)
            .ok_or_else(|| Error::not_found(format!("index '{}' is not loaded", kind)))?;
        let result = worker.lock().query(query);
        result
    }
}
