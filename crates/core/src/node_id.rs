//! Hierarchical node identifiers
//!
//! Node ids use dynamic level numbering: the document's root element is `1`,
//! its children `1.1`, `1.2`, ..., their children `1.1.1` and so on. The parent
//! of any node, and therefore its whole ancestor chain, is derived from the id
//! alone without a storage lookup. Lexicographic order of the level numbers is
//! document order.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::str::FromStr;

/// Hierarchical node identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(SmallVec<[u32; 8]>);

impl NodeId {
    /// Id of the document's root element
    pub fn root() -> Self {
        NodeId(smallvec![1])
    }

    /// Build an id from its level numbers; every level must be positive
    pub fn from_levels(levels: &[u32]) -> Result<Self> {
        if levels.is_empty() || levels.contains(&0) {
            return Err(Error::invalid_operation(format!(
                "invalid node id levels: {:?}",
                levels
            )));
        }
        Ok(NodeId(SmallVec::from_slice(levels)))
    }

    /// Id of this node's `n`-th child (1-based)
    pub fn child(&self, n: u32) -> Self {
        let mut levels = self.0.clone();
        levels.push(n);
        NodeId(levels)
    }

    /// Id of the following sibling
    pub fn next_sibling(&self) -> Self {
        let mut levels = self.0.clone();
        if let Some(last) = levels.last_mut() {
            *last += 1;
        }
        NodeId(levels)
    }

    /// Parent id; `None` for the root element
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(NodeId(SmallVec::from_slice(&self.0[..self.0.len() - 1])))
    }

    /// Depth in the tree; the root element is at level 1
    pub fn tree_level(&self) -> usize {
        self.0.len()
    }

    /// Level numbers, root first
    pub fn levels(&self) -> &[u32] {
        &self.0
    }

    /// Whether `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &NodeId) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0[..])
    }

    /// Whether `self` is `other` or lies below it
    pub fn is_descendant_or_self_of(&self, other: &NodeId) -> bool {
        self == other || self.is_descendant_of(other)
    }

    /// Ancestor-or-self at the given tree level, walking parents
    pub fn ancestor_at_level(&self, level: usize) -> Option<Self> {
        if level == 0 || level > self.tree_level() {
            return None;
        }
        let mut id = self.clone();
        while id.tree_level() > level {
            id = id.parent()?;
        }
        Some(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for level in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", level)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let levels = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| Error::invalid_operation(format!("invalid node id: '{}'", s)))
            })
            .collect::<Result<Vec<_>>>()?;
        NodeId::from_levels(&levels)
    }
}
