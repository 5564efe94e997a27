//! Index scans
//!
//! `scan_index` reports the distinct keys an engine holds for a set of
//! documents (terms for the full-text engine, graph nodes for the triple
//! store) with how often they occur. Hints narrow the scan.

use nodex_core::{DocumentId, NodeId, QName};
use std::collections::{BTreeMap, BTreeSet};

/// Hint key: only report keys starting with this value
pub const START_VALUE: &str = "start-value";
/// Hint key: only report keys found under these names
pub const QNAMES_KEY: &str = "qnames";

/// Value of a scan hint
#[derive(Debug, Clone, PartialEq)]
pub enum HintValue {
    /// Free-form string
    Text(String),
    /// Set of names
    QNames(Vec<QName>),
}

/// Options narrowing a scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanHints {
    values: BTreeMap<String, HintValue>,
}

impl ScanHints {
    /// No hints: report everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to keys with this prefix
    pub fn with_start_value(self, prefix: impl Into<String>) -> Self {
        self.with(START_VALUE, HintValue::Text(prefix.into()))
    }

    /// Restrict to keys found under these names
    pub fn with_qnames(self, qnames: Vec<QName>) -> Self {
        self.with(QNAMES_KEY, HintValue::QNames(qnames))
    }

    /// Set an arbitrary hint
    pub fn with(mut self, key: impl Into<String>, value: HintValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Hint by key
    pub fn get(&self, key: &str) -> Option<&HintValue> {
        self.values.get(key)
    }

    /// String hint by key
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(HintValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Prefix filter, if given
    pub fn start_value(&self) -> Option<&str> {
        self.text(START_VALUE)
    }

    /// Name filter, if given
    pub fn qnames(&self) -> Option<&[QName]> {
        match self.values.get(QNAMES_KEY) {
            Some(HintValue::QNames(q)) => Some(q),
            _ => None,
        }
    }

    /// Whether `key` passes the prefix filter
    pub fn accepts_key(&self, key: &str) -> bool {
        self.start_value().map_or(true, |prefix| key.starts_with(prefix))
    }

    /// Whether `qname` passes the name filter
    pub fn accepts_qname(&self, qname: &QName) -> bool {
        self.qnames().map_or(true, |names| names.contains(qname))
    }
}

/// One distinct key and where it occurs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrences {
    /// The key (term or graph node)
    pub term: String,
    /// Total number of occurrences
    pub occurrences: u64,
    /// Documents containing the key
    pub documents: BTreeSet<DocumentId>,
}

impl Occurrences {
    /// Key with no occurrences yet
    pub fn new(term: impl Into<String>) -> Self {
        Occurrences {
            term: term.into(),
            occurrences: 0,
            documents: BTreeSet::new(),
        }
    }

    /// Record `count` occurrences in `doc`
    pub fn add(&mut self, doc: DocumentId, count: u64) {
        self.occurrences += count;
        self.documents.insert(doc);
    }

    /// Number of distinct documents
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

/// Context nodes restricting a scan to their subtrees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: BTreeSet<(DocumentId, NodeId)>,
}

impl NodeSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    pub fn insert(&mut self, doc: DocumentId, node: NodeId) {
        self.nodes.insert((doc, node));
    }

    /// Whether `node` of `doc` is one of the context nodes or below one
    pub fn covers(&self, doc: DocumentId, node: &NodeId) -> bool {
        self.nodes
            .iter()
            .any(|(d, n)| *d == doc && node.is_descendant_or_self_of(n))
    }

    /// Number of context nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<(DocumentId, NodeId)> for NodeSet {
    fn from_iter<I: IntoIterator<Item = (DocumentId, NodeId)>>(iter: I) -> Self {
        NodeSet {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Merge per-key counts into a sorted occurrence list
pub fn collect_occurrences(
    entries: impl IntoIterator<Item = (String, DocumentId, u64)>,
) -> Vec<Occurrences> {
    let mut by_term: BTreeMap<String, Occurrences> = BTreeMap::new();
    for (term, doc, count) in entries {
        by_term
            .entry(term.clone())
            .or_insert_with(|| Occurrences::new(term))
            .add(doc, count);
    }
    by_term.into_values().collect()
}
