//! Full-text worker
//!
//! Per-session context of the full-text engine. In `Store` and `RemoveSome`
//! cycles the listener collects the text of every rule-selected node; on
//! flush the collected nodes are added to or subtracted from the shared
//! inverted store. `RemoveAll` drops the document's postings directly.

use crate::collector::TextCollector;
use crate::postings::InvertedIndex;
use crate::tokenizer::tokenize;
use nodex_core::{
    DocumentId, DocumentRef, Error, Namespaces, NodeId, NodePath, PathComponent, Result,
};
use nodex_engine::indexing::{
    collect_occurrences, configure_from, Deferred, DocumentBinding, IndexConfig, IndexKind,
    IndexWorker, Mode, NodeSet, Occurrences, QueryHit, QueryResult, ScanHints, StreamListener,
};
use nodex_engine::xml::ConfigNode;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Element carrying a full-text configuration
pub const CONFIG_ELEMENT: &str = "fulltext";

/// Element of a single full-text rule
pub const RULE_ELEMENT: &str = "text";

/// One session's full-text context
pub struct FullTextWorker {
    store: Arc<InvertedIndex>,
    binding: DocumentBinding,
    listener: Deferred<TextCollector>,
}

impl FullTextWorker {
    /// Worker over a shared store
    pub fn new(store: Arc<InvertedIndex>) -> Self {
        FullTextWorker {
            store,
            binding: DocumentBinding::default(),
            listener: Deferred::new(TextCollector::default()),
        }
    }

    fn remove_document(&self, doc: &DocumentRef) {
        let removed = self.store.remove_document(doc.id);
        debug!(target: "nodex::fulltext", doc = %doc, postings = removed, "Document removed");
    }
}

impl IndexWorker for FullTextWorker {
    fn kind(&self) -> IndexKind {
        IndexKind::FullText
    }

    fn configure(&self, nodes: &[ConfigNode], namespaces: &Namespaces) -> Result<Option<IndexConfig>> {
        configure_from(nodes, namespaces, CONFIG_ELEMENT, RULE_ELEMENT)
    }

    fn set_document(&mut self, doc: &DocumentRef, config: Option<Arc<IndexConfig>>, mode: Mode) {
        self.listener.reset();
        self.binding.bind(doc, config, mode);
        self.listener.sink_mut().reset(self.binding.config.clone());
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

    /// The topmost ancestor-or-self whose path is selected by a rule: its
    /// text includes the changed node.
    fn reindex_root(
        &self,
        node: &NodeId,
        path: &NodePath,
        config: Option<&IndexConfig>,
        _insert: bool,
        include_self: bool,
    ) -> Option<NodeId> {
        let config = config?;
        let last = if include_self {
            path.len()
        } else {
            path.len().saturating_sub(1)
        };
        let names = path.components().iter().filter_map(|c| match c {
            PathComponent::Name(qname) => Some(qname),
            _ => None,
        });
        let mut prefix = NodePath::new();
        for (level, qname) in names.enumerate().take(last) {
            prefix.push(qname.clone());
            if config.matching(&prefix).is_some() {
                return node.ancestor_at_level(level + 1);
            }
        }
        None
    }

    fn flush(&mut self) -> Result<()> {
        self.listener.reset();
        let collected = self.listener.sink_mut().take();
        let Some(doc) = self.binding.document.clone() else {
            return Ok(());
        };
        match self.binding.mode {
            Mode::Store => {
                let nodes = collected.len();
                for node in collected {
                    self.store.add(doc.id, &doc.uri, node);
                }
                debug!(target: "nodex::fulltext", doc = %doc, nodes, "Nodes indexed");
            }
            Mode::RemoveSome => {
                let nodes: BTreeSet<NodeId> = collected.into_iter().map(|n| n.node_id).collect();
                let removed = self.store.remove_nodes(doc.id, &nodes);
                debug!(target: "nodex::fulltext", doc = %doc, postings = removed, "Nodes removed");
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
        debug!(target: "nodex::fulltext", collection, documents = documents.len(), "Collection removed");
        Ok(())
    }

    fn check_index(&self) -> bool {
        self.store.check()
    }

    fn scan_index(
        &self,
        documents: &[DocumentRef],
        context: Option<&NodeSet>,
        hints: &ScanHints,
    ) -> Result<Vec<Occurrences>> {
        let wanted: BTreeSet<DocumentId> = documents.iter().map(|d| d.id).collect();
        let mut entries = Vec::new();
        for term in self.store.terms() {
            if !hints.accepts_key(&term) {
                continue;
            }
            let Some(postings) = self.store.lookup(&term) else {
                continue;
            };
            for entry in postings.entries {
                if wanted.contains(&entry.document)
                    && hints.accepts_qname(&entry.qname)
                    && context.map_or(true, |c| c.covers(entry.document, &entry.node_id))
                {
                    entries.push((term.clone(), entry.document, u64::from(entry.tf)));
                }
            }
        }
        Ok(collect_occurrences(entries))
    }

    /// Term query: every whitespace-separated word must occur in the node.
    /// A word written `field:word` only matches postings of that field.
    /// Hits are scored by the sum of `tf * boost * idf` and sorted by
    /// descending score.
    fn query(&self, query: &str) -> Result<QueryResult> {
        let mut terms: Vec<(Option<&str>, String)> = Vec::new();
        for word in query.split_whitespace() {
            let (field, text) = match word.split_once(':') {
                Some((field, text)) if !field.is_empty() => (Some(field), text),
                _ => (None, word),
            };
            terms.extend(tokenize(text).into_iter().map(|t| (field, t)));
        }
        if terms.is_empty() {
            return Err(Error::query(format!("no searchable term in '{}'", query)));
        }

        let mut scores: HashMap<(String, NodeId), (usize, f32)> = HashMap::new();
        for (field, term) in &terms {
            let Some(postings) = self.store.lookup(term) else {
                return Ok(QueryResult::Hits(Vec::new()));
            };
            let idf = self.store.compute_idf(term);
            let mut seen = BTreeSet::new();
            for entry in postings.entries {
                if field.is_some() && entry.field.as_deref() != *field {
                    continue;
                }
                let key = (entry.uri, entry.node_id);
                if !seen.insert(key.clone()) {
                    continue;
                }
                let score = scores.entry(key).or_insert((0, 0.0));
                score.0 += 1;
                score.1 += entry.tf as f32 * entry.boost * idf;
            }
        }

        let mut hits: Vec<QueryHit> = scores
            .into_iter()
            .filter(|(_, (matched, _))| *matched == terms.len())
            .map(|((document, node_id), (_, score))| QueryHit {
                document,
                node_id,
                score,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.cmp(&b.document))
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        Ok(QueryResult::Hits(hits))
    }
}
