//! Stored XML documents
//!
//! A `Document` is an arena of element and text nodes keyed by `NodeId`.
//! Ids are assigned while parsing: the root element is `1`, and the
//! attributes of an element `X` take `X.1 .. X.k` before its children
//! continue the numbering. Since `NodeId` orders in document order, the
//! arena iterates nodes in the order they appear in the markup.
//!
//! `walk` replays a subtree as node events. In `Mode::Store` the elements
//! handed to `start_element` carry no attributes, exactly as an element being
//! built would; in the removal modes they are complete.

use crate::indexing::listener::{NodeEvent, StreamPipeline};
use crate::indexing::mode::Mode;
use crate::xml::{raw_name, NamespaceScope};
use nodex_core::{
    AttrType, Attribute, DocumentRef, Element, Error, NodeId, NodePath, QName, Result, Text,
    TextKind, XML_NS,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum StoredNode {
    Element {
        qname: QName,
        attributes: Vec<Attribute>,
        children: Vec<NodeId>,
    },
    Text(Text),
}

/// Parsed XML document
#[derive(Debug, Clone)]
pub struct Document {
    doc: DocumentRef,
    nodes: BTreeMap<NodeId, StoredNode>,
    root: Option<NodeId>,
}

/// Element whose children are being replayed
struct Frame<'a> {
    id: &'a NodeId,
    qname: &'a QName,
    attributes: &'a [Attribute],
    children: &'a [NodeId],
    next: usize,
}

struct Builder {
    scope: NamespaceScope,
    open: Vec<(NodeId, u32)>,
}

impl Document {
    /// Parse `xml` into a document stored under `doc`.
    ///
    /// Whitespace-only text is dropped. Comments and processing
    /// instructions are skipped.
    ///
    /// # Errors
    /// `Error::Serialization` for malformed markup, an undeclared prefix or
    /// more than one root element.
    pub fn parse(doc: DocumentRef, xml: &str) -> Result<Document> {
        let mut document = Document {
            doc,
            nodes: BTreeMap::new(),
            root: None,
        };
        let mut builder = Builder {
            scope: NamespaceScope::new(),
            open: Vec::new(),
        };
        let mut reader = Reader::from_str(xml);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let id = document.open_element(&mut builder, e)?;
                    let next = document.attribute_count(&id) + 1;
                    builder.open.push((id, next));
                }
                Ok(Event::Empty(ref e)) => {
                    document.open_element(&mut builder, e)?;
                    builder.scope.pop();
                }
                Ok(Event::End(_)) => {
                    builder.open.pop();
                    builder.scope.pop();
                }
                Ok(Event::Text(ref e)) => {
                    let data = e.unescape().map_err(|err| document.malformed(err))?;
                    if !data.trim().is_empty() {
                        document.add_text(&mut builder, data.into_owned(), TextKind::Text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    let data = String::from_utf8_lossy(e).into_owned();
                    document.add_text(&mut builder, data, TextKind::CData);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(document.malformed(e)),
                _ => {}
            }
        }

        if !builder.open.is_empty() {
            return Err(document.malformed("unclosed element"));
        }
        if document.root.is_none() {
            return Err(document.malformed("no root element"));
        }
        Ok(document)
    }

    fn malformed(&self, cause: impl std::fmt::Display) -> Error {
        Error::Serialization(format!("malformed document {}: {}", self.doc.uri, cause))
    }

    fn next_child_id(&mut self, builder: &mut Builder) -> Option<NodeId> {
        let (parent, next) = builder.open.last_mut()?;
        let id = parent.child(*next);
        *next += 1;
        let parent = parent.clone();
        if let Some(StoredNode::Element { children, .. }) = self.nodes.get_mut(&parent) {
            children.push(id.clone());
        }
        Some(id)
    }

    fn open_element(&mut self, builder: &mut Builder, start: &BytesStart<'_>) -> Result<NodeId> {
        let raw_attributes = builder.scope.push(start)?;
        let qname = builder.scope.element_name(&raw_name(start))?;

        let id = match self.next_child_id(builder) {
            Some(id) => id,
            None if self.root.is_none() => NodeId::root(),
            None => return Err(self.malformed("more than one root element")),
        };

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (n, (name, value)) in raw_attributes.into_iter().enumerate() {
            let attr_name = builder.scope.attribute_name(&name)?;
            let mut attribute = Attribute::new(id.child(n as u32 + 1), attr_name, value);
            if attribute.qname.local_name() == "id" && attribute.qname.namespace() == XML_NS {
                attribute.attr_type = AttrType::Id;
            }
            attributes.push(attribute);
        }

        if self.root.is_none() {
            self.root = Some(id.clone());
        }
        self.nodes.insert(
            id.clone(),
            StoredNode::Element {
                qname,
                attributes,
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    fn add_text(&mut self, builder: &mut Builder, data: String, kind: TextKind) {
        if let Some(id) = self.next_child_id(builder) {
            let mut text = Text::new(id.clone(), data);
            text.kind = kind;
            self.nodes.insert(id, StoredNode::Text(text));
        }
    }

    fn attribute_count(&self, id: &NodeId) -> u32 {
        match self.nodes.get(id) {
            Some(StoredNode::Element { attributes, .. }) => attributes.len() as u32,
            _ => 0,
        }
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Reference the document is stored under
    pub fn document_ref(&self) -> &DocumentRef {
        &self.doc
    }

    /// Root element id, `None` once the root has been removed
    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    /// Number of element and text nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether an element or text node with this id exists
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Element with its attributes
    pub fn element(&self, id: &NodeId) -> Option<Element> {
        match self.nodes.get(id)? {
            StoredNode::Element {
                qname, attributes, ..
            } => Some(Element {
                node_id: id.clone(),
                qname: qname.clone(),
                attributes: attributes.clone(),
            }),
            StoredNode::Text(_) => None,
        }
    }

    /// Ids of the elements named `qname`, in document order
    pub fn find_elements(&self, qname: &QName) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, StoredNode::Element { qname: q, .. } if q == qname))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Concatenated text below a node
    pub fn text_content(&self, id: &NodeId) -> String {
        self.nodes
            .range(id.clone()..)
            .take_while(|(k, _)| k.is_descendant_or_self_of(id))
            .filter_map(|(_, node)| match node {
                StoredNode::Text(t) => Some(t.data.as_str()),
                StoredNode::Element { .. } => None,
            })
            .collect()
    }

    /// Names from the root down to `id`, inclusive for elements
    ///
    /// # Errors
    /// `Error::NotFound` if `id` is not in the document.
    pub fn path_to(&self, id: &NodeId) -> Result<NodePath> {
        let node = self.node(id)?;
        let mut path = self.ancestor_path(id)?;
        if let StoredNode::Element { qname, .. } = node {
            path.push(qname.clone());
        }
        Ok(path)
    }

    fn ancestor_path(&self, id: &NodeId) -> Result<NodePath> {
        let mut path = NodePath::new();
        for level in 1..id.tree_level() {
            let ancestor = id
                .ancestor_at_level(level)
                .ok_or_else(|| Error::not_found(format!("ancestor of {}", id)))?;
            if let StoredNode::Element { qname, .. } = self.node(&ancestor)? {
                path.push(qname.clone());
            }
        }
        Ok(path)
    }

    fn node(&self, id: &NodeId) -> Result<&StoredNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::not_found(format!("node {} in {}", id, self.doc.uri)))
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Replay the whole document
    pub fn walk_all(&self, pipeline: &mut StreamPipeline<'_>, mode: Mode) -> Result<()> {
        match &self.root {
            Some(root) => self.walk(root, pipeline, mode),
            None => Ok(()),
        }
    }

    /// Replay the subtree rooted at `start`
    ///
    /// # Errors
    /// `Error::NotFound` if `start` is not in the document.
    pub fn walk(&self, start: &NodeId, pipeline: &mut StreamPipeline<'_>, mode: Mode) -> Result<()> {
        let mut path = self.ancestor_path(start)?;
        self.emit(start, &mut path, pipeline, mode)
    }

    fn emit<'a>(
        &'a self,
        start: &'a NodeId,
        path: &mut NodePath,
        pipeline: &mut StreamPipeline<'_>,
        mode: Mode,
    ) -> Result<()> {
        let mut frames: Vec<Frame<'a>> = Vec::new();
        self.enter(start, path, pipeline, mode, &mut frames)?;

        while let Some(frame) = frames.last_mut() {
            let children = frame.children;
            match children.get(frame.next) {
                Some(child) => {
                    frame.next += 1;
                    self.enter(child, path, pipeline, mode, &mut frames)?;
                }
                None => {
                    let complete = Element {
                        node_id: frame.id.clone(),
                        qname: frame.qname.clone(),
                        attributes: frame.attributes.to_vec(),
                    };
                    frames.pop();
                    pipeline.dispatch(NodeEvent::EndElement(&complete), path);
                    path.pop();
                }
            }
        }
        Ok(())
    }

    /// Emit the opening events of a node; elements leave a frame whose
    /// children are replayed before their end event
    fn enter<'a>(
        &'a self,
        id: &'a NodeId,
        path: &mut NodePath,
        pipeline: &mut StreamPipeline<'_>,
        mode: Mode,
        frames: &mut Vec<Frame<'a>>,
    ) -> Result<()> {
        match self.node(id)? {
            StoredNode::Text(text) => pipeline.dispatch(NodeEvent::Characters(text), path),
            StoredNode::Element {
                qname,
                attributes,
                children,
            } => {
                path.push(qname.clone());
                if mode == Mode::Store {
                    let building = Element::new(id.clone(), qname.clone());
                    pipeline.dispatch(NodeEvent::StartElement(&building), path);
                } else {
                    let complete = Element {
                        node_id: id.clone(),
                        qname: qname.clone(),
                        attributes: attributes.clone(),
                    };
                    pipeline.dispatch(NodeEvent::StartElement(&complete), path);
                }
                for attribute in attributes {
                    path.push(attribute.qname.clone());
                    pipeline.dispatch(NodeEvent::Attribute(attribute), path);
                    path.pop();
                }
                frames.push(Frame {
                    id,
                    qname,
                    attributes,
                    children,
                    next: 0,
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Remove a node and everything below it
    ///
    /// # Errors
    /// `Error::NotFound` if `id` is not in the document.
    pub fn remove_subtree(&mut self, id: &NodeId) -> Result<()> {
        self.node(id)?;
        if let Some(parent) = id.parent() {
            if let Some(StoredNode::Element { children, .. }) = self.nodes.get_mut(&parent) {
                children.retain(|c| c != id);
            }
        }
        self.nodes.retain(|k, _| !k.is_descendant_or_self_of(id));
        if self.root.as_ref() == Some(id) {
            self.root = None;
        }
        Ok(())
    }
}
