//! Inverted store
//!
//! Term → posting list, where each posting is one indexed node of one
//! document. Document frequency counts distinct documents, so IDF follows
//! the collection rather than the number of matching nodes.

use dashmap::DashMap;
use nodex_core::{DocumentId, NodeId, QName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// PostingEntry
// ============================================================================

/// One indexed node containing a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingEntry {
    /// Owning document
    pub document: DocumentId,
    /// Owning document's URI
    pub uri: String,
    /// Indexed element or attribute
    pub node_id: NodeId,
    /// Name of the indexed node
    pub qname: QName,
    /// Field name of the rule that produced the entry
    pub field: Option<String>,
    /// Term frequency within the node's text
    pub tf: u32,
    /// Boost of the rule (or attribute condition) that produced the entry
    pub boost: f32,
}

/// Every node containing a term
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    /// Entries in insertion order
    pub entries: Vec<PostingEntry>,
}

impl PostingList {
    /// Remove entries matching a predicate, returning how many were removed
    fn remove_where(&mut self, predicate: impl Fn(&PostingEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !predicate(e));
        before - self.entries.len()
    }

    /// Number of nodes containing the term
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Text of one node ready to be indexed
#[derive(Debug, Clone, PartialEq)]
pub struct NodeText {
    /// Indexed element or attribute
    pub node_id: NodeId,
    /// Its name
    pub qname: QName,
    /// Field name of the producing rule
    pub field: Option<String>,
    /// Analyzed terms
    pub terms: Vec<String>,
    /// Effective boost
    pub boost: f32,
}

/// Serialized form of the store
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PostingsSnapshot {
    /// Every term with its postings
    pub terms: Vec<(String, PostingList)>,
}

// ============================================================================
// InvertedIndex
// ============================================================================

/// Term → postings, safe for concurrent readers and writers
#[derive(Default)]
pub struct InvertedIndex {
    postings: DashMap<String, PostingList>,

    /// Document → number of postings it owns
    documents: DashMap<DocumentId, usize>,

    /// Bumped on every change
    version: AtomicU64,
}

impl InvertedIndex {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Number of documents with at least one posting
    pub fn total_docs(&self) -> usize {
        self.documents.len()
    }

    /// Distinct documents containing a term
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings
            .get(term)
            .map(|list| {
                list.entries
                    .iter()
                    .map(|e| e.document)
                    .collect::<BTreeSet<_>>()
                    .len()
            })
            .unwrap_or(0)
    }

    /// Inverse document frequency with smoothing:
    /// IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)
    pub fn compute_idf(&self, term: &str) -> f32 {
        let n = self.total_docs() as f32;
        let df = self.doc_freq(term) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Postings of a term
    pub fn lookup(&self, term: &str) -> Option<PostingList> {
        self.postings.get(term).map(|r| r.clone())
    }

    /// Every term, sorted
    pub fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = self.postings.iter().map(|r| r.key().clone()).collect();
        terms.sort();
        terms
    }

    /// Whether the document owns any posting
    pub fn contains_document(&self, document: DocumentId) -> bool {
        self.documents.contains_key(&document)
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Add one node's terms
    pub fn add(&self, document: DocumentId, uri: &str, node: NodeText) {
        let mut tf: HashMap<String, u32> = HashMap::new();
        for term in node.terms {
            *tf.entry(term).or_insert(0) += 1;
        }
        if tf.is_empty() {
            return;
        }
        let added = tf.len();
        for (term, count) in tf {
            self.postings.entry(term).or_default().entries.push(PostingEntry {
                document,
                uri: uri.to_string(),
                node_id: node.node_id.clone(),
                qname: node.qname.clone(),
                field: node.field.clone(),
                tf: count,
                boost: node.boost,
            });
        }
        *self.documents.entry(document).or_insert(0) += added;
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Remove every posting of a document. Returns the number removed.
    pub fn remove_document(&self, document: DocumentId) -> usize {
        let removed = self.remove_where(|e| e.document == document);
        self.documents.remove(&document);
        removed
    }

    /// Remove the postings of the given nodes of a document
    pub fn remove_nodes(&self, document: DocumentId, nodes: &BTreeSet<NodeId>) -> usize {
        if nodes.is_empty() {
            return 0;
        }
        let removed = self.remove_where(|e| e.document == document && nodes.contains(&e.node_id));
        if removed > 0 {
            let empty = match self.documents.get_mut(&document) {
                Some(mut count) => {
                    *count = count.saturating_sub(removed);
                    *count == 0
                }
                None => false,
            };
            if empty {
                self.documents.remove(&document);
            }
        }
        removed
    }

    fn remove_where(&self, predicate: impl Fn(&PostingEntry) -> bool) -> usize {
        let mut removed = 0;
        for mut list in self.postings.iter_mut() {
            removed += list.remove_where(&predicate);
        }
        self.postings.retain(|_, list| !list.is_empty());
        if removed > 0 {
            self.version.fetch_add(1, Ordering::Release);
        }
        removed
    }

    /// Drop everything
    pub fn clear(&self) {
        self.postings.clear();
        self.documents.clear();
        self.version.fetch_add(1, Ordering::Release);
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Copy of the store for serialization, terms sorted
    pub fn snapshot(&self) -> PostingsSnapshot {
        let mut terms: Vec<(String, PostingList)> = self
            .postings
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));
        PostingsSnapshot { terms }
    }

    /// Replace the content with a snapshot
    pub fn restore(&self, snapshot: PostingsSnapshot) {
        self.clear();
        for (term, list) in snapshot.terms {
            for entry in &list.entries {
                *self.documents.entry(entry.document).or_insert(0) += 1;
            }
            self.postings.insert(term, list);
        }
    }

    /// Structural consistency: no empty lists, no zero frequencies, and
    /// per-document counts that add up
    pub fn check(&self) -> bool {
        let mut counted: HashMap<DocumentId, usize> = HashMap::new();
        for list in self.postings.iter() {
            if list.is_empty() || list.entries.iter().any(|e| e.tf == 0) {
                return false;
            }
            for entry in &list.entries {
                *counted.entry(entry.document).or_insert(0) += 1;
            }
        }
        counted.len() == self.documents.len()
            && counted
                .iter()
                .all(|(doc, n)| self.documents.get(doc).is_some_and(|c| *c == *n))
    }
}
