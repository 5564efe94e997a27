//! Identity types shared across crates
//!
//! - `DocumentId`: numeric id assigned by the document store
//! - `DocumentRef`: what an index worker knows about the document it is bound to
//! - `SessionId`: opaque worker-context identity (one per concurrent session)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric document identity, unique within a database instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Store-assigned id
    pub id: DocumentId,
    /// Absolute document URI, e.g. `/db/test/a.xml`
    pub uri: String,
    /// URI of the owning collection, e.g. `/db/test`
    pub collection: String,
    /// Whether the resource is binary rather than XML
    pub binary: bool,
}

impl DocumentRef {
    /// XML document reference; the collection is the URI's parent
    pub fn new(id: DocumentId, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let collection = match uri.rfind('/') {
            Some(0) => "/".to_string(),
            Some(pos) => uri[..pos].to_string(),
            None => String::new(),
        };
        DocumentRef {
            id,
            uri,
            collection,
            binary: false,
        }
    }

    /// Mark the reference as a binary resource
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    /// Last path segment of the URI
    pub fn file_name(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// Worker-context identity
///
/// One per concurrently open session. Index workers are registered per
/// session and dropped when it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}
