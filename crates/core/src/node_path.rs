//! Node paths and path patterns
//!
//! A `NodePath` is the ancestor chain of a node, root first. The same type
//! doubles as a compiled path pattern: patterns may contain wildcard steps
//! (`*`) and descendant steps (`//`).
//!
//! ```text
//! /tei:TEI/tei:text//tei:p      anchored at the root, any depth below text
//! //tei:p                       any p element
//! //tei:div/*                   any child element of a div
//! //tei:p/@rend                 rend attribute of any p
//! //tei:p/@*                    any attribute of a p
//! ```

use crate::error::{Error, Result};
use crate::qname::{Namespaces, QName};
use std::fmt;

/// One step of a path or pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    /// Named step
    Name(QName),
    /// `*`: exactly one element step with any name
    Wildcard,
    /// `@*`: exactly one attribute step with any name
    AttributeWildcard,
    /// `//`: zero or more intermediate steps
    Skip,
}

impl PathComponent {
    fn accepts(&self, step: &PathComponent) -> bool {
        match (self, step) {
            (PathComponent::Wildcard, PathComponent::Name(q)) => !q.is_attribute(),
            (PathComponent::AttributeWildcard, PathComponent::Name(q)) => q.is_attribute(),
            (PathComponent::Name(a), PathComponent::Name(b)) => a == b,
            _ => false,
        }
    }
}

/// Ancestor chain or compiled path pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    components: Vec<PathComponent>,
    include_descendants: bool,
}

impl NodePath {
    /// Empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-step path
    pub fn from_qname(qname: QName) -> Self {
        NodePath {
            components: vec![PathComponent::Name(qname)],
            include_descendants: false,
        }
    }

    /// Compile a path pattern, resolving prefixes against `namespaces`.
    ///
    /// The compiled pattern matches nodes at exactly the described position;
    /// use [`NodePath::with_descendants`] to also accept everything below it.
    pub fn parse(namespaces: &Namespaces, pattern: &str) -> Result<Self> {
        let mut path = NodePath::new();
        let mut token = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '/' => {
                    path.push_token(&token, namespaces)?;
                    token.clear();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        if path.components.last() != Some(&PathComponent::Skip) {
                            path.components.push(PathComponent::Skip);
                        }
                    }
                }
                c if c.is_whitespace() => {}
                c => token.push(c),
            }
        }
        path.push_token(&token, namespaces)?;
        Ok(path)
    }

    fn push_token(&mut self, token: &str, namespaces: &Namespaces) -> Result<()> {
        match token {
            "" => {}
            "*" => self.components.push(PathComponent::Wildcard),
            "@*" => self.components.push(PathComponent::AttributeWildcard),
            name => {
                let qname = QName::parse(name, namespaces).map_err(|e| {
                    Error::config(format!("invalid step '{}' in path pattern: {}", name, e))
                })?;
                self.components.push(PathComponent::Name(qname));
            }
        }
        Ok(())
    }

    /// Whether the pattern also accepts every node below a matched node
    pub fn with_descendants(mut self, include: bool) -> Self {
        self.include_descendants = include;
        self
    }

    /// Append a named step
    pub fn push(&mut self, qname: QName) {
        self.components.push(PathComponent::Name(qname));
    }

    /// Remove the last step
    pub fn pop(&mut self) -> Option<PathComponent> {
        self.components.pop()
    }

    /// Number of steps, counting wildcard and descendant markers
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the path has no steps
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of steps that consume a path component (names and wildcards)
    pub fn effective_len(&self) -> usize {
        self.components
            .iter()
            .filter(|c| !matches!(c, PathComponent::Skip))
            .count()
    }

    /// All steps, root first
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Name of the terminal step, if it is a named step
    pub fn last_qname(&self) -> Option<&QName> {
        match self.components.last() {
            Some(PathComponent::Name(q)) => Some(q),
            _ => None,
        }
    }

    /// Whether `other` (a concrete ancestor chain) unifies with this pattern
    pub fn matches(&self, other: &NodePath) -> bool {
        self.match_from(0, &other.components, 0)
    }

    fn match_from(&self, pi: usize, other: &[PathComponent], pj: usize) -> bool {
        let Some(step) = self.components.get(pi) else {
            return pj == other.len() || self.include_descendants;
        };
        match step {
            PathComponent::Skip => (pj..=other.len()).any(|k| self.match_from(pi + 1, other, k)),
            step => {
                pj < other.len()
                    && step.accepts(&other[pj])
                    && self.match_from(pi + 1, other, pj + 1)
            }
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous_skip = false;
        for component in &self.components {
            match component {
                PathComponent::Skip => {
                    write!(f, "//")?;
                    previous_skip = true;
                    continue;
                }
                PathComponent::Wildcard if !previous_skip => write!(f, "/*")?,
                PathComponent::Wildcard => write!(f, "*")?,
                PathComponent::AttributeWildcard if !previous_skip => write!(f, "/@*")?,
                PathComponent::AttributeWildcard => write!(f, "@*")?,
                PathComponent::Name(q) if !previous_skip => write!(f, "/{}", q)?,
                PathComponent::Name(q) => write!(f, "{}", q)?,
            }
            previous_skip = false;
        }
        Ok(())
    }
}
