//! Graphs and the triple store
//!
//! The store keeps one named graph per document URI. Queries run against
//! the default graph, which is the union of every named graph.

use crate::term::{Term, Triple};
use nodex_core::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Graph
// ============================================================================

/// A set of triples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: BTreeSet<Triple>,
}

impl Graph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple, returning whether it was new
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Remove a triple, returning whether it was present
    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    /// Whether the triple is present
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Triples in order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Triples matching a pattern; `None` positions match anything
    pub fn matching<'a>(
        &'a self,
        subject: Option<&'a Term>,
        predicate: Option<&'a Term>,
        object: Option<&'a Term>,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| {
            subject.map_or(true, |s| *s == t.subject)
                && predicate.map_or(true, |p| *p == t.predicate)
                && object.map_or(true, |o| *o == t.object)
        })
    }

    /// Every subject and object with the number of triples it occurs in
    pub fn node_counts(&self) -> BTreeMap<&Term, u64> {
        let mut counts = BTreeMap::new();
        for t in &self.triples {
            *counts.entry(&t.subject).or_insert(0) += 1;
            if t.object != t.subject {
                *counts.entry(&t.object).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Graph {
            triples: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Graph {
    type Item = Triple;
    type IntoIter = std::collections::btree_set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

// ============================================================================
// TripleStore
// ============================================================================

/// Serialized form of the store
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Graph name → triples
    pub graphs: BTreeMap<String, Vec<Triple>>,
}

/// Named graphs keyed by document URI
#[derive(Default)]
pub struct TripleStore {
    graphs: RwLock<BTreeMap<String, Graph>>,

    /// Bumped on every change
    version: AtomicU64,
}

impl TripleStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Whether a named graph exists
    pub fn contains_graph(&self, name: &str) -> bool {
        self.graphs.read().contains_key(name)
    }

    /// Names of every graph
    pub fn graph_names(&self) -> Vec<String> {
        self.graphs.read().keys().cloned().collect()
    }

    /// Copy of one named graph
    pub fn graph(&self, name: &str) -> Option<Graph> {
        self.graphs.read().get(name).cloned()
    }

    /// Total number of triples over all named graphs
    pub fn len(&self) -> usize {
        self.graphs.read().values().map(Graph::len).sum()
    }

    /// Whether no graph holds a triple
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of every named graph
    pub fn default_graph(&self) -> Graph {
        self.graphs
            .read()
            .values()
            .flat_map(|g| g.iter().cloned())
            .collect()
    }

    /// Add triples to a named graph, creating it if needed. Returns how many
    /// were new.
    pub fn add(&self, name: &str, triples: impl IntoIterator<Item = Triple>) -> usize {
        let mut graphs = self.graphs.write();
        let graph = graphs.entry(name.to_string()).or_default();
        let added = triples.into_iter().filter(|t| graph.insert(t.clone())).count();
        if added > 0 {
            self.bump();
        }
        added
    }

    /// Subtract triples from a named graph. Returns `None` when the graph
    /// does not exist, otherwise how many were removed. A graph left empty
    /// is dropped.
    pub fn remove(&self, name: &str, triples: impl IntoIterator<Item = Triple>) -> Option<usize> {
        let mut graphs = self.graphs.write();
        let graph = graphs.get_mut(name)?;
        let removed = triples.into_iter().filter(|t| graph.remove(t)).count();
        if graph.is_empty() {
            graphs.remove(name);
        }
        if removed > 0 {
            self.bump();
        }
        Some(removed)
    }

    /// Drop a named graph. Returns whether it existed.
    pub fn drop_graph(&self, name: &str) -> bool {
        let dropped = self.graphs.write().remove(name).is_some();
        if dropped {
            self.bump();
        }
        dropped
    }

    /// Drop everything
    pub fn clear(&self) {
        self.graphs.write().clear();
        self.bump();
    }

    /// Copy of the store for serialization
    pub fn snapshot(&self) -> DatasetSnapshot {
        DatasetSnapshot {
            graphs: self
                .graphs
                .read()
                .iter()
                .map(|(name, g)| (name.clone(), g.iter().cloned().collect()))
                .collect(),
        }
    }

    /// Replace the content with a snapshot
    pub fn restore(&self, snapshot: DatasetSnapshot) {
        let graphs = snapshot
            .graphs
            .into_iter()
            .filter(|(_, triples)| !triples.is_empty())
            .map(|(name, triples)| (name, triples.into_iter().collect()))
            .collect();
        *self.graphs.write() = graphs;
        self.bump();
    }

    /// Serialize the store as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Well-formedness: no empty graphs, literal-free subjects, IRI
    /// predicates
    pub fn check(&self) -> bool {
        self.graphs.read().values().all(|g| {
            !g.is_empty()
                && g
                    .iter()
                    .all(|t| !t.subject.is_literal() && matches!(t.predicate, Term::Iri(_)))
        })
    }
}
