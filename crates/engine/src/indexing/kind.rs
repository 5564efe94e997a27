//! Index engine kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// The index engines this database knows how to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Inverted full-text index over element and attribute text
    FullText,
    /// Triple store over embedded RDF/XML
    Rdf,
}

impl IndexKind {
    /// All kinds, in default load order
    pub const ALL: [IndexKind; 2] = [IndexKind::FullText, IndexKind::Rdf];

    /// Stable identifier, also used as the engine's data sub-directory
    pub fn id(&self) -> &'static str {
        match self {
            IndexKind::FullText => "fulltext",
            IndexKind::Rdf => "rdf",
        }
    }

    /// Local name of the element that configures this engine inside a
    /// collection's `<index>` block
    pub fn config_element(&self) -> &'static str {
        match self {
            IndexKind::FullText => "fulltext",
            IndexKind::Rdf => "rdf",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
