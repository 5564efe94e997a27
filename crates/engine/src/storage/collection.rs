//! Collections
//!
//! A collection is a named set of resources plus the index configuration
//! parsed from its collection configuration. XML resources are shared behind
//! a `RwLock` so readers can walk a document while the collection map is not
//! held.

use crate::indexing::IndexSpec;
use crate::storage::document::Document;
use nodex_core::DocumentRef;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A stored resource
#[derive(Debug, Clone)]
pub enum Resource {
    /// Parsed XML document
    Xml(Arc<RwLock<Document>>),
    /// Opaque binary content, never indexed
    Binary {
        /// Reference the resource is stored under
        doc: DocumentRef,
        /// Content
        data: Arc<Vec<u8>>,
    },
}

impl Resource {
    /// Reference the resource is stored under
    pub fn document_ref(&self) -> DocumentRef {
        match self {
            Resource::Xml(doc) => doc.read().document_ref().clone(),
            Resource::Binary { doc, .. } => doc.clone(),
        }
    }

    /// The XML document, if this is one
    pub fn as_xml(&self) -> Option<&Arc<RwLock<Document>>> {
        match self {
            Resource::Xml(doc) => Some(doc),
            Resource::Binary { .. } => None,
        }
    }
}

/// Named set of resources
#[derive(Debug, Default)]
pub struct Collection {
    uri: String,
    resources: BTreeMap<String, Resource>,
    spec: Option<Arc<IndexSpec>>,
    config_source: Option<String>,
}

impl Collection {
    /// Empty collection
    pub fn new(uri: impl Into<String>) -> Self {
        Collection {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Collection URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Index configuration set on this collection itself
    pub fn spec(&self) -> Option<&Arc<IndexSpec>> {
        self.spec.as_ref()
    }

    /// Source text of the collection configuration
    pub fn config_source(&self) -> Option<&str> {
        self.config_source.as_deref()
    }

    /// Replace the index configuration
    pub fn set_spec(&mut self, spec: IndexSpec, source: impl Into<String>) {
        self.spec = Some(Arc::new(spec));
        self.config_source = Some(source.into());
    }

    /// Resource by file name
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Add or replace a resource
    pub fn insert(&mut self, name: impl Into<String>, resource: Resource) -> Option<Resource> {
        self.resources.insert(name.into(), resource)
    }

    /// Remove a resource by file name
    pub fn remove(&mut self, name: &str) -> Option<Resource> {
        self.resources.remove(name)
    }

    /// References of every resource, in name order
    pub fn documents(&self) -> Vec<DocumentRef> {
        self.resources.values().map(Resource::document_ref).collect()
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the collection holds no resource
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodex_core::DocumentId;

    #[test]
    fn test_resources_by_name() {
        let mut c = Collection::new("/db/test");
        let doc = DocumentRef::new(DocumentId(1), "/db/test/a.xml");
        let parsed = Document::parse(doc.clone(), "<a/>").unwrap();
        c.insert("a.xml", Resource::Xml(Arc::new(RwLock::new(parsed))));
        c.insert(
            "b.bin",
            Resource::Binary {
                doc: DocumentRef::new(DocumentId(2), "/db/test/b.bin").binary(),
                data: Arc::new(vec![1, 2, 3]),
            },
        );
        assert_eq!(c.len(), 2);
        assert!(c.get("a.xml").unwrap().as_xml().is_some());
        assert!(c.get("b.bin").unwrap().as_xml().is_none());
        let docs = c.documents();
        assert_eq!(docs[0], doc);
        assert!(docs[1].binary);
        assert!(c.remove("a.xml").is_some());
        assert!(c.remove("a.xml").is_none());
    }

    #[test]
    fn test_spec_and_source() {
        let mut c = Collection::new("/db/test");
        assert!(c.spec().is_none());
        c.set_spec(IndexSpec::new(), "<collection/>");
        assert!(c.spec().is_some());
        assert_eq!(c.config_source(), Some("<collection/>"));
    }
}
